//! Core AST types shared by every pipeline stage.
//!
//! The lexer, parser, syntax transformer and macro expander all operate on
//! the same three-variant [`SExp`] shape (lists, symbols, literals); the
//! HQL-AST lowerer narrows that into [`HqlNode`], a newtype that marks "this
//! tree has already had every macro stripped and every surface rewrite
//! applied". Nothing about the shape changes between the two stages — only
//! what a caller is allowed to assume about its contents.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

/// Interned identifier for a source file within one compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

static NEXT_FILE_ID: AtomicU32 = AtomicU32::new(0);

impl FileId {
    /// Mints a fresh, process-unique `FileId`. Interning by path (so the
    /// same file on disk always maps to the same id) is the caller's job —
    /// see `resolve::FileTable`.
    pub fn next() -> Self {
        FileId(NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for FileId {
    fn default() -> Self {
        FileId(0)
    }
}

/// A source location, carried by every token and AST node for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Position {
    pub file: FileId,
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl Position {
    pub fn new(file: FileId, line: u32, column: u32, offset: u32) -> Self {
        Self { file, line, column, offset }
    }
}

/// A literal value: the leaves of the S-expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    Nil,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::Num(n) => write!(f, "{n}"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Nil => write!(f, "nil"),
        }
    }
}

/// The surface and macro-IR representation: literal, symbol, or list.
///
/// Invariants: an empty list is legal and distinct from `nil`; lists never
/// carry dotted-pair notation. A macro's `&rest`/`&` binding is materialized
/// as an ordinary `List` node; `unquote-splicing` recognizes it structurally
/// rather than through a separate marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SExprKind {
    Literal(Literal),
    Symbol(String),
    List(Vec<SExp>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SExp {
    pub kind: Box<SExprKind>,
    pub pos: Position,
}

impl SExp {
    pub fn new(kind: SExprKind, pos: Position) -> Self {
        Self { kind: Box::new(kind), pos }
    }

    pub fn symbol(name: impl Into<String>, pos: Position) -> Self {
        Self::new(SExprKind::Symbol(name.into()), pos)
    }

    pub fn list(items: Vec<SExp>, pos: Position) -> Self {
        Self::new(SExprKind::List(items), pos)
    }

    pub fn literal(lit: Literal, pos: Position) -> Self {
        Self::new(SExprKind::Literal(lit), pos)
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &*self.kind {
            SExprKind::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match &*self.kind {
            SExprKind::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<SExp>> {
        match *self.kind {
            SExprKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_empty_list(&self) -> bool {
        matches!(&*self.kind, SExprKind::List(items) if items.is_empty())
    }

    /// Head-symbol-dispatch helper: returns `(head_symbol, rest_args)` when
    /// this node is a non-empty list whose first element is a symbol.
    pub fn as_call(&self) -> Option<(&str, &[SExp])> {
        let items = self.as_list()?;
        let (head, rest) = items.split_first()?;
        Some((head.as_symbol()?, rest))
    }

    pub fn type_name(&self) -> &'static str {
        match &*self.kind {
            SExprKind::Literal(Literal::Str(_)) => "string",
            SExprKind::Literal(Literal::Num(_)) => "number",
            SExprKind::Literal(Literal::Bool(_)) => "bool",
            SExprKind::Literal(Literal::Nil) => "nil",
            SExprKind::Symbol(_) => "symbol",
            SExprKind::List(_) => "list",
        }
    }

    /// A minimal, stable textual rendering used as the macro-expansion
    /// cache key and in error messages. Not a pretty-printer.
    pub fn to_key_string(&self) -> String {
        match &*self.kind {
            SExprKind::Literal(lit) => lit.to_string(),
            SExprKind::Symbol(s) => s.clone(),
            SExprKind::List(items) => {
                let inner: Vec<String> = items.iter().map(SExp::to_key_string).collect();
                format!("({})", inner.join(" "))
            }
        }
    }
}

/// Marks a macro-free, fully-desugared `SExp` tree: the output of the
/// HQL-AST lowerer and the input to the IR builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HqlNode(pub SExp);

impl HqlNode {
    pub fn inner(&self) -> &SExp {
        &self.0
    }

    pub fn into_inner(self) -> SExp {
        self.0
    }
}

/// A resolved, on-disk HQL source file together with its interned id.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub text: String,
}
