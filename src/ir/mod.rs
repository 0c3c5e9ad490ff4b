//! The intermediate representation the IR builder produces from a
//! macro-free [`crate::ast::HqlNode`] tree, and the target
//! AST emitter lowers into [`crate::emit::JsNode`].
//!
//! IR is deliberately JS-shaped already — named arguments are folded into
//! object literals, `defn`/`fn` become function declarations/expressions,
//! dotted access is already `js-get`/`js-call` by the time it reaches here
//! — but it still carries HQL-level concepts (`EnumDecl`, `ObjectPattern`)
//! the emitter is responsible for shaping into plain ECMAScript.

pub mod builder;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeAnnotation {
    Named(String),
    Array(Box<TypeAnnotation>),
    Any,
}

/// A destructuring target: either a plain binding name, or `{ a, b: c }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    Identifier(String),
    Object(Vec<ObjectPatternField>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatternField {
    pub key: String,
    /// The local binding name, when it differs from `key` (`{ key: local }`).
    pub binding: Option<String>,
    pub default: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub pattern: Pattern,
    pub type_annotation: Option<TypeAnnotation>,
    /// `(fn (a b & rest) ...)` — `rest` becomes a `Param` with this set,
    /// emitted as `...rest`.
    pub is_rest: bool,
}

impl Param {
    pub fn simple(name: String) -> Self {
        Self { pattern: Pattern::Identifier(name), type_annotation: None, is_rest: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportSpecifier {
    Named { imported: String, local: String },
    Namespace { local: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    VariableDecl { name: String, init: Expr, is_const: bool, type_annotation: Option<TypeAnnotation> },
    /// `const {a, b} = params;` — the object-parameter unpacking prefixed
    /// to a function's body when it takes named arguments.
    DestructuringDecl { pattern: Pattern, init: Expr, is_const: bool },
    /// HQL's `fn` is always an anonymous function expression; `(def name
    /// (fn ...))` binds that anonymous function to `name`, which the
    /// emitter renders as `const name = function(...) {}` rather than a
    /// named `function name() {}` declaration — `is_anonymous` records
    /// which rendering applies. `is_named_params` mirrors whether the
    /// destructuring-parameter rewrite in `build_function` applied.
    FunctionDecl {
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        return_type: Option<TypeAnnotation>,
        is_anonymous: bool,
        is_named_params: bool,
    },
    EnumDecl { name: String, variants: Vec<String> },
    /// `is_local` is false for `npm:`/`jsr:`/`http(s):` specifiers, which
    /// the downstream bundler resolves rather than the resolver.
    ImportDecl { source: String, specifiers: Vec<ImportSpecifier>, is_local: bool },
    ExportDecl { decl: Box<Decl> },
}

/// The key half of a [`Expr::Member`] access. `get`'s explicit form can name
/// a dynamic expression (`(get obj idx)`), not just a static field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyKey {
    Name(String),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Identifier(String),
    StringLit(String),
    NumericLit(f64),
    BooleanLit(bool),
    NullLit,
    ArrayLit(Vec<Expr>),
    /// A plain object literal with static keys — produced by folding a
    /// call's trailing named arguments, never by `hash-map`.
    ObjectLit(Vec<(String, Expr)>),
    /// `(hash-map k1 v1 ...)` — every key/value pair is rendered as a
    /// computed property (`{[k1]: v1}`), per spec.
    ComputedObjectLit(Vec<(Expr, Expr)>),
    /// A destructuring pattern used as an expression position placeholder
    /// when folding named-argument calls; never appears in emitted output
    /// except as a function parameter.
    ObjectPattern(Vec<ObjectPatternField>),
    Binary { op: String, left: Box<Expr>, right: Box<Expr> },
    /// `(new Ctor args...)` lowers to a call to the sentinel identifier
    /// `"$new"` with `[Ctor, args...]`; the emitter is what recognizes the
    /// sentinel and turns it into an actual `NewExpression`.
    ///
    /// `is_named_args` is set when this call's trailing `name: value` pairs
    /// were folded into the final element of `args` as an object literal
    ///.
    Call { callee: Box<Expr>, args: Vec<Expr>, is_named_args: bool },
    Member { object: Box<Expr>, property: PropertyKey, computed: bool },
    FunctionExpr { params: Vec<Param>, body: Vec<Stmt>, return_type: Option<TypeAnnotation> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Decl(Decl),
    Expression(Expr),
    Return(Option<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub body: Vec<Stmt>,
}
