//! Core macro data types: parameter lists and macro templates.
//!
//! Every HQL macro — `defmacro` (system-wide) or `macro` (module-scoped) —
//! is a declarative template: a parameter list plus a body expression,
//! evaluated by the small interpreter in [`crate::macros::eval`] when the
//! macro is invoked. Unlike a native-function macro, the body here is
//! always HQL source the user wrote, never a Rust closure.

use crate::ast::SExp;
use crate::error::{ErrorKind, HqlError, SourceContext};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A macro's formal parameters: zero or more required positional names,
/// plus an optional `&rest` name that collects every trailing argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamList {
    pub required: Vec<String>,
    pub rest: Option<String>,
}

impl ParamList {
    pub fn arity_description(&self) -> String {
        match (self.required.len(), &self.rest) {
            (n, None) => format!("exactly {n}"),
            (n, Some(_)) => format!("at least {n}"),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(String::as_str).chain(self.rest.as_deref())
    }
}

/// A declarative macro: parameters plus an unevaluated body template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroTemplate {
    pub params: ParamList,
    pub body: SExp,
}

impl MacroTemplate {
    /// Builds a template, rejecting duplicate parameter names up front so
    /// the expander never has to guess which binding a name refers to.
    pub fn new(params: ParamList, body: SExp, ctx: &SourceContext) -> Result<Self, HqlError> {
        let mut seen = HashSet::new();
        for name in params.names() {
            if !seen.insert(name) {
                let kind = ErrorKind::ValidationError {
                    expected: "distinct parameter names".to_string(),
                    found: format!("duplicate parameter '{name}'"),
                };
                return Err(crate::err_ctx!(kind, ctx, body.pos));
            }
        }
        Ok(MacroTemplate { params, body })
    }
}
