//! HQL-AST lowering: the last stage that still sees raw
//! `SExp` trees, and the first to hand back the macro-free [`HqlNode`]
//! the IR builder consumes.
//!
//! By the time a program reaches here the macro expander has already
//! stripped every `defmacro`/`macro` declaration; this stage's only job is
//! to confirm that really happened (a macro expander bug manifesting here
//! is far easier to diagnose than one manifesting three stages later) and
//! to reject any reader-macro head (`quote`, `quasiquote`, `unquote`,
//! `unquote-splicing`) that survived outside of a macro body, since those
//! only make sense during expansion.

use crate::ast::{HqlNode, SExp, SExprKind};
use crate::error::{ErrorKind, HqlError, SourceContext};

const EXPANSION_ONLY_HEADS: &[&str] = &["defmacro", "macro", "quote", "quasiquote", "unquote", "unquote-splicing"];

pub fn lower_program(forms: Vec<SExp>, ctx: &SourceContext) -> Result<Vec<HqlNode>, HqlError> {
    forms.into_iter().map(|f| lower(f, ctx)).collect()
}

pub fn lower(node: SExp, ctx: &SourceContext) -> Result<HqlNode, HqlError> {
    check_no_expansion_residue(&node, ctx)?;
    Ok(HqlNode(node))
}

fn check_no_expansion_residue(node: &SExp, ctx: &SourceContext) -> Result<(), HqlError> {
    if let Some((head, _)) = node.as_call() {
        if EXPANSION_ONLY_HEADS.contains(&head) {
            return Err(HqlError::new(
                ErrorKind::TransformError { offending_form: node.to_key_string(), stage: "lower" },
                ctx,
                node.pos,
            ));
        }
    }
    if let SExprKind::List(items) = &*node.kind {
        for item in items {
            check_no_expansion_residue(item, ctx)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FileId;
    use crate::parser::parse_program;

    fn lower_src(src: &str) -> Result<Vec<HqlNode>, HqlError> {
        let ctx = SourceContext::new("t", src.to_string());
        let forms = parse_program(FileId(0), src).unwrap();
        lower_program(forms, &ctx)
    }

    #[test]
    fn ordinary_forms_lower_unchanged() {
        let out = lower_src("(def x 1)").unwrap();
        assert_eq!(out[0].inner().as_call().unwrap().0, "def");
    }

    #[test]
    fn leftover_quasiquote_is_rejected() {
        assert!(lower_src("`(a b)").is_err());
    }

    #[test]
    fn leftover_defmacro_is_rejected() {
        assert!(lower_src("(defmacro m (x) x)").is_err());
    }
}
