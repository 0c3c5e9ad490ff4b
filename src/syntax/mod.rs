//! Desugars surface forms to the canonical core language.
//!
//! Each rewrite is structural and purely local: a function from one
//! `SExp` to its canonical equivalent, applied bottom-up so nested sugar
//! (a `defn` whose body uses dotted-method calls) is fully expanded in one
//! pass. Shape violations are raised eagerly as `TransformError` rather than
//! deferred to the lowerer, validating immediately after building a node.

use crate::ast::{Literal, Position, SExp, SExprKind};
use crate::error::{ErrorKind, HqlError, SourceContext};

pub fn desugar_program(forms: Vec<SExp>, ctx: &SourceContext) -> Result<Vec<SExp>, HqlError> {
    forms.into_iter().map(|f| desugar(f, ctx)).collect()
}

pub fn desugar(node: SExp, ctx: &SourceContext) -> Result<SExp, HqlError> {
    let node = desugar_children(node, ctx)?;
    desugar_head(node, ctx)
}

fn desugar_children(node: SExp, ctx: &SourceContext) -> Result<SExp, HqlError> {
    let pos = node.pos;
    match *node.kind {
        SExprKind::List(items) => {
            let items = items.into_iter().map(|i| desugar(i, ctx)).collect::<Result<Vec<_>, _>>()?;
            Ok(SExp::list(items, pos))
        }
        other => Ok(SExp::new(other, pos)),
    }
}

/// Dispatches on the (already-desugared-below) list's head symbol.
fn desugar_head(node: SExp, ctx: &SourceContext) -> Result<SExp, HqlError> {
    let pos = node.pos;
    let Some(items) = node.as_list().map(|s| s.to_vec()) else {
        return Ok(dotted_value_position(node, ctx));
    };
    let Some(head) = items.first().and_then(SExp::as_symbol).map(str::to_string) else {
        return Ok(SExp::list(items, pos));
    };

    match head.as_str() {
        "defn" => desugar_defn(items, pos, ctx),
        "import" => desugar_import(items, pos, ctx),
        _ => desugar_dotted_call(items, pos, ctx),
    }
}

/// `(defn name (params…) body…)` → `(def name (fn (params…) body…))`.
fn desugar_defn(items: Vec<SExp>, pos: Position, ctx: &SourceContext) -> Result<SExp, HqlError> {
    if items.len() < 3 {
        return Err(shape_error(ctx, pos, "(defn name (params...) body...)", "too few forms"));
    }
    let name = items[1].clone();
    let params = items[2].clone();
    let body = items[3..].to_vec();
    let mut fn_form = vec![SExp::symbol("fn", pos), params];
    fn_form.extend(body);
    let fn_node = SExp::list(fn_form, pos);
    Ok(SExp::list(vec![SExp::symbol("def", pos), name, fn_node], pos))
}

/// Normalizes every accepted import form to the canonical
/// `(import source specifier*)` shape consumed by the IR builder, where each
/// specifier is `(name)`, `(name alias)`, or `(* name)` for a namespace bind.
fn desugar_import(items: Vec<SExp>, pos: Position, ctx: &SourceContext) -> Result<SExp, HqlError> {
    // (import "path") -- side-effect import, already canonical.
    if items.len() == 2 && matches!(&*items[1].kind, SExprKind::Literal(Literal::Str(_))) {
        return Ok(SExp::list(items, pos));
    }
    // (import name from "path") -- namespace import.
    if items.len() == 4 {
        if let (Some(name), Some("from"), Literal::Str(_)) =
            (items[1].as_symbol(), items[2].as_symbol(), literal_of(&items[3]))
        {
            let spec = SExp::list(vec![SExp::symbol("*", pos), SExp::symbol(name, pos)], pos);
            return Ok(SExp::list(vec![SExp::symbol("import", pos), items[3].clone(), spec], pos));
        }
    }
    // (import [a, b from "path"]) / (import [a as x, b from "path"]) -- selective import.
    if items.len() == 2 {
        if let Some(bracket) = items[1].as_list() {
            return desugar_selective_import(bracket, pos, ctx);
        }
    }
    Err(shape_error(ctx, pos, "a recognized import form", "unrecognized import shape"))
}

fn literal_of(node: &SExp) -> &Literal {
    match &*node.kind {
        SExprKind::Literal(lit) => lit,
        _ => &Literal::Nil,
    }
}

fn desugar_selective_import(bracket: &[SExp], pos: Position, ctx: &SourceContext) -> Result<SExp, HqlError> {
    // Vector form, after the parser/syntax-sugar layer already split commas
    // into separate symbols: [a as x, b, from, "path"]. We scan for the
    // trailing `from "path"` and treat everything before it as specifiers,
    // where `name as alias` becomes one two-element specifier.
    let from_idx = bracket
        .iter()
        .position(|e| e.as_symbol() == Some("from"))
        .ok_or_else(|| shape_error(ctx, pos, "[a, b from \"path\"]", "missing 'from'"))?;
    let path = bracket
        .get(from_idx + 1)
        .cloned()
        .ok_or_else(|| shape_error(ctx, pos, "[a, b from \"path\"]", "missing path after 'from'"))?;

    let mut specs = Vec::new();
    let mut i = 0;
    while i < from_idx {
        let name = bracket[i].clone();
        if bracket.get(i + 1).and_then(SExp::as_symbol) == Some("as") {
            let alias = bracket
                .get(i + 2)
                .cloned()
                .ok_or_else(|| shape_error(ctx, pos, "name as alias", "missing alias"))?;
            specs.push(SExp::list(vec![name, alias], pos));
            i += 3;
        } else {
            specs.push(SExp::list(vec![name], pos));
            i += 1;
        }
    }
    let mut form = vec![SExp::symbol("import", pos), path];
    form.extend(specs);
    Ok(SExp::list(form, pos))
}

/// Property shorthand and dotted-symbol rewrites:
/// - `((expr) .prop)` in a list's second position → `(js-get expr "prop")`
/// - `obj.method` in head position → `(js-call obj "method" args...)`
/// - `obj.prop` elsewhere is handled by `dotted_value_position` below.
fn desugar_dotted_call(items: Vec<SExp>, pos: Position, ctx: &SourceContext) -> Result<SExp, HqlError> {
    if items.len() >= 2 {
        if let Some(prop) = items[1].as_symbol().filter(|s| s.starts_with('.')) {
            let obj = items[0].clone();
            let prop_name = prop.trim_start_matches('.').to_string();
            if prop_name.is_empty() {
                return Err(shape_error(ctx, pos, "(.prop expr)", "empty property name"));
            }
            return Ok(SExp::list(
                vec![SExp::symbol("js-get", pos), obj, SExp::literal(Literal::Str(prop_name), pos)],
                pos,
            ));
        }
    }
    if let Some(head) = items.first().and_then(SExp::as_symbol) {
        if let Some((obj_name, method)) = split_dotted(head) {
            let mut form = vec![
                SExp::symbol("js-call", pos),
                SExp::symbol(obj_name, pos),
                SExp::literal(Literal::Str(method), pos),
            ];
            form.extend(items.into_iter().skip(1));
            return Ok(SExp::list(form, pos));
        }
    }
    Ok(SExp::list(items, pos))
}

/// `obj.prop` used as a value (not in call-head position) → `(js-get obj "prop")`.
fn dotted_value_position(node: SExp, _ctx: &SourceContext) -> SExp {
    let pos = node.pos;
    if let Some(name) = node.as_symbol() {
        if let Some((obj, prop)) = split_dotted(name) {
            return SExp::list(
                vec![SExp::symbol("js-get", pos), SExp::symbol(obj, pos), SExp::literal(Literal::Str(prop), pos)],
                pos,
            );
        }
    }
    node
}

fn split_dotted(name: &str) -> Option<(String, String)> {
    let idx = name.find('.')?;
    if idx == 0 || idx == name.len() - 1 {
        return None;
    }
    let (obj, rest) = name.split_at(idx);
    Some((obj.to_string(), rest[1..].to_string()))
}

fn shape_error(ctx: &SourceContext, pos: Position, expected: &str, found: &str) -> HqlError {
    HqlError::new(ErrorKind::ValidationError { expected: expected.to_string(), found: found.to_string() }, ctx, pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FileId;
    use crate::parser::parse_program;

    fn desugar_src(src: &str) -> SExp {
        let ctx = SourceContext::new("t", src.to_string());
        let forms = parse_program(FileId(0), src).unwrap();
        desugar(forms.into_iter().next().unwrap(), &ctx).unwrap()
    }

    #[test]
    fn defn_becomes_def_fn() {
        let n = desugar_src("(defn f (x) x)");
        let items = n.as_list().unwrap();
        assert_eq!(items[0].as_symbol(), Some("def"));
        assert_eq!(items[1].as_symbol(), Some("f"));
        assert_eq!(items[2].as_call().unwrap().0, "fn");
    }

    #[test]
    fn dotted_head_becomes_js_call() {
        let n = desugar_src("(console.log \"hi\")");
        let (head, args) = n.as_call().unwrap();
        assert_eq!(head, "js-call");
        assert_eq!(args[0].as_symbol(), Some("console"));
    }

    #[test]
    fn dotted_value_becomes_js_get() {
        let n = desugar_src("(def x obj.prop)");
        let items = n.as_list().unwrap();
        assert_eq!(items[2].as_call().unwrap().0, "js-get");
    }

    #[test]
    fn namespace_import_normalizes() {
        let n = desugar_src("(import foo from \"./foo.hql\")");
        let (head, args) = n.as_call().unwrap();
        assert_eq!(head, "import");
        assert_eq!(args[1].as_call().unwrap().0, "*");
    }

    #[test]
    fn selective_import_with_alias_normalizes() {
        let n = desugar_src("(import [greet as hi from \"./m.hql\"])");
        let (head, args) = n.as_call().unwrap();
        assert_eq!(head, "import");
        let spec = args[1].as_list().unwrap();
        assert_eq!(spec[0].as_symbol(), Some("greet"));
        assert_eq!(spec[1].as_symbol(), Some("hi"));
    }
}
