//! Unified diagnostic type for every pipeline stage.
//!
//! Every stage (lexer, parser, syntax transformer, resolver, registry,
//! expander, lowerer, IR builder, emitter) raises the same [`HqlError`]
//! struct, tagged with a stage-specific [`ErrorKind`]. A lower stage's
//! error is never discarded: it is wrapped as
//! `cause` by whichever higher stage observed it, so a `MacroError` raised
//! three call frames down still carries its original `ImportError` chain.

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::ast::Position;

/// Source text plus a display name, bundled for miette's `SourceCode` trait.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self { name: name.into(), content: content.into() }
    }

    pub fn fallback(reason: &str) -> Self {
        Self { name: "<internal>".into(), content: format!("; {reason}") }
    }

    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("no source available")
    }
}

/// The stage-specific payload of a diagnostic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Unterminated string, or any other lexical failure.
    #[error("lex error: {reason}")]
    LexError { reason: String },
    /// Unclosed list, unexpected `)`, or any other structural parse failure.
    #[error("parse error: {reason}")]
    ParseError { reason: String },
    /// Shape/arity mismatch caught by local validation (desugarer, lowerer).
    #[error("expected {expected}, found {found}")]
    ValidationError { expected: String, found: String },
    /// No resolution strategy found the module; `tried` lists every
    /// candidate path the resolver probed.
    #[error(
        "could not resolve \"{path}\" from {} (tried {} candidate path(s))",
        importer.as_deref().unwrap_or("<entry>"),
        tried.len()
    )]
    ImportError { path: String, importer: Option<String>, tried: Vec<PathBuf> },
    /// Raised by the macro registry or expander.
    #[error("macro '{macro_name}' error in {}", source_file.as_deref().unwrap_or("<unknown file>"))]
    MacroError { macro_name: String, source_file: Option<String> },
    /// Surface sugar survived into a stage that requires canonical forms.
    #[error("[{stage}] unrecognized form: {offending_form}")]
    TransformError { offending_form: String, stage: &'static str },
    /// The IR builder or emitter could not lower a node.
    #[error("cannot emit {node_kind}: {reason}")]
    CodeGenError { node_kind: &'static str, reason: String },
}

impl ErrorKind {
    fn code_suffix(&self) -> &'static str {
        match self {
            ErrorKind::LexError { .. } => "lex",
            ErrorKind::ParseError { .. } => "parse",
            ErrorKind::ValidationError { .. } => "validation",
            ErrorKind::ImportError { .. } => "import",
            ErrorKind::MacroError { .. } => "macro",
            ErrorKind::TransformError { .. } => "transform",
            ErrorKind::CodeGenError { .. } => "codegen",
        }
    }

    fn primary_label(&self) -> &'static str {
        match self {
            ErrorKind::LexError { .. } => "lexical error here",
            ErrorKind::ParseError { .. } => "parse error here",
            ErrorKind::ValidationError { .. } => "invalid shape here",
            ErrorKind::ImportError { .. } => "could not resolve this import",
            ErrorKind::MacroError { .. } => "macro error here",
            ErrorKind::TransformError { .. } => "unrecognized form",
            ErrorKind::CodeGenError { .. } => "could not lower this node",
        }
    }
}

/// The unified error type. Derives `thiserror::Error` for `Display`/`source`
/// and implements `miette::Diagnostic` by hand (the per-stage code, label,
/// and cause-chaining logic don't fit a single `#[diagnostic(...)]` shape
/// since `src`/`span`/`cause` live on this wrapper, not on `ErrorKind`).
#[derive(Error, Debug)]
#[error("{kind}")]
pub struct HqlError {
    pub kind: ErrorKind,
    pub src: Arc<NamedSource<String>>,
    pub span: SourceSpan,
    pub help: Option<String>,
    #[source]
    pub cause: Option<Box<HqlError>>,
}

impl HqlError {
    pub fn new(kind: ErrorKind, ctx: &SourceContext, pos: Position) -> Self {
        let span = position_to_span(pos);
        Self { kind, src: ctx.to_named_source(), span, help: None, cause: None }
    }

    pub fn with_span(kind: ErrorKind, ctx: &SourceContext, span: SourceSpan) -> Self {
        Self { kind, src: ctx.to_named_source(), span, help: None, cause: None }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_cause(mut self, cause: HqlError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Wraps a lower-stage error with this stage's own context, preserving
    /// the original as `cause`.
    pub fn wrap(stage_kind: ErrorKind, ctx: &SourceContext, span: SourceSpan, cause: HqlError) -> Self {
        Self::with_span(stage_kind, ctx, span).with_cause(cause)
    }
}

fn position_to_span(pos: Position) -> SourceSpan {
    SourceSpan::from(pos.offset as usize..pos.offset as usize + 1)
}

/// Substring-matching suggestion table, applied to a rendered message when
/// no explicit `help` was set (e.g. "unexpected ')'" -> "check for
/// mismatched parentheses").
pub fn suggest_for_message(message: &str) -> Option<String> {
    let rules: &[(&str, &str)] = &[
        ("unexpected ')'", "check for mismatched parentheses"),
        ("unterminated string", "check for a missing closing '\"'"),
        ("unclosed list", "check for a missing ')'"),
        ("unknown macro", "check the macro name and its imports"),
        ("duplicate parameter", "rename one of the conflicting parameters"),
        ("odd length", "`let` bindings must come in name/value pairs"),
    ];
    let lower = message.to_lowercase();
    rules.iter().find(|(needle, _)| lower.contains(needle)).map(|(_, s)| s.to_string())
}

impl Diagnostic for HqlError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("hql::{}", self.kind.code_suffix())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .clone()
            .or_else(|| suggest_for_message(&self.kind.to_string()))
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(
            vec![LabeledSpan::new_with_span(Some(self.kind.primary_label().to_string()), self.span)].into_iter(),
        ))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.src)
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        self.cause.as_deref().map(|e| e as &dyn Diagnostic)
    }
}

pub type HqlResult<T> = Result<T, HqlError>;
