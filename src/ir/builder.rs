//! Lowers a macro-free [`HqlNode`] tree into [`crate::ir`].
//!
//! Most of the work here is recognizing a fixed set of canonical core
//! forms (`def`, `fn`, `import`, `export`, `defenum`, `let`, `list`,
//! `hash-map`, `get`, `js-get`, `js-call`, `new`, arithmetic operators,
//! `str`, `keyword`) and building their direct IR counterpart; everything
//! else is an ordinary call, with any trailing `name:` / value pairs
//! folded into a single object-literal argument (spec's named-argument
//! convention) and every identifier run through the kebab-case →
//! camelCase rewrite ECMAScript expects.

use crate::ast::{HqlNode, Literal, Position, SExp, SExprKind};
use crate::config::CompileConfig;
use crate::error::{ErrorKind, HqlError, SourceContext};
use crate::ir::{
    Decl, Expr, ImportSpecifier, Module, ObjectPatternField, Param, Pattern, PropertyKey, Stmt, TypeAnnotation,
};

const ARITHMETIC_OPS: &[&str] = &["+", "-", "*", "/"];
/// The synthetic parameter name a named-argument function destructures.
const PARAMS_BINDING: &str = "params";

pub fn build_module(nodes: Vec<HqlNode>, ctx: &SourceContext, config: &CompileConfig) -> Result<Module, HqlError> {
    let body = nodes.into_iter().map(|n| build_stmt(n.into_inner(), ctx, config)).collect::<Result<Vec<_>, _>>()?;
    Ok(Module { body })
}

/// Rewrites a kebab/snake-case HQL identifier into the camelCase name
/// emitted ECMAScript code, e.g. `my-name` and `my_name` both → `myName`.
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut capitalize_next = false;
    for c in name.chars() {
        if c == '-' || c == '_' {
            capitalize_next = true;
            continue;
        }
        if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn build_stmt(node: SExp, ctx: &SourceContext, config: &CompileConfig) -> Result<Stmt, HqlError> {
    if let Some((head, args)) = node.as_call() {
        match head {
            "def" => return Ok(Stmt::Decl(build_def(args, node.pos, ctx, config)?)),
            // `(export name value)` is the same two-argument shape
            // `build_def` already handles, so reuse it rather than
            // re-deriving `fn`/import special cases here.
            "export" if args.len() == 2 => {
                let decl = build_def(args, node.pos, ctx, config)?;
                return Ok(Stmt::Decl(Decl::ExportDecl { decl: Box::new(decl) }));
            }
            "export" => {
                let [inner] = args else { return Err(shape_err(ctx, node.pos, "(export name value) or (export (defenum ...))")) };
                let inner_decl = match inner.as_call() {
                    Some(("defenum", enum_args)) => build_defenum(enum_args, inner.pos, ctx)?,
                    _ => return Err(shape_err(ctx, node.pos, "export of a value or a defenum")),
                };
                return Ok(Stmt::Decl(Decl::ExportDecl { decl: Box::new(inner_decl) }));
            }
            "defenum" => return Ok(Stmt::Decl(build_defenum(args, node.pos, ctx)?)),
            "import" => return Ok(Stmt::Decl(build_import(args, node.pos, ctx)?)),
            "let" => return build_let_stmt(args, node.pos, ctx, config),
            _ => {}
        }
    }
    Ok(Stmt::Expression(build_expr(node, ctx, config)?))
}

/// `(def x e) → VariableDecl{const, x, lower(e)}` — `def`
/// always binds `const`; `let`'s statement form is the only place a `let`
/// binding keyword appears.
fn build_def(args: &[SExp], pos: Position, ctx: &SourceContext, config: &CompileConfig) -> Result<Decl, HqlError> {
    let [name_node, init] = args else { return Err(shape_err(ctx, pos, "(def name value)")) };
    let name = camel(name_node, ctx)?;
    if let Some(("fn", fn_args)) = init.as_call() {
        let (params, body, is_named_params) = build_function(fn_args, init.pos, ctx, config, Some(&name))?;
        return Ok(Decl::FunctionDecl { name, params, body, return_type: None, is_anonymous: true, is_named_params });
    }
    if let Some(("import", import_args)) = init.as_call() {
        return build_def_import(&name, import_args, init.pos, ctx, config);
    }
    let value = build_expr(init.clone(), ctx, config)?;
    Ok(Decl::VariableDecl { name, init: value, is_const: true, type_annotation: None })
}

/// `(def x (import "p"))` builds a named specifier when `p` begins
/// with the configured standard-library URL prefix, a default/namespace
/// specifier otherwise. `x` is bound either way to the whole module value.
fn build_def_import(
    name: &str,
    args: &[SExp],
    pos: Position,
    ctx: &SourceContext,
    config: &CompileConfig,
) -> Result<Decl, HqlError> {
    let [path_node] = args else { return Err(shape_err(ctx, pos, "(import \"path\")")) };
    let path = match &*path_node.kind {
        SExprKind::Literal(Literal::Str(s)) => s.clone(),
        _ => return Err(shape_err(ctx, path_node.pos, "a string import path")),
    };
    let is_local = !crate::resolve::is_external(&path);
    let specifier = if path.starts_with(&config.stdlib_url_prefix) {
        ImportSpecifier::Named { imported: name.to_string(), local: name.to_string() }
    } else {
        ImportSpecifier::Namespace { local: name.to_string() }
    };
    Ok(Decl::ImportDecl { source: path, specifiers: vec![specifier], is_local })
}

/// Builds a function's parameter list and body. If any parameter carries a
/// trailing colon, or `fn_name` is in `config.object_param_fns`, every
/// parameter is folded into a single destructuring pattern and the body is
/// prefixed with `const { a, b } = params;`.
fn build_function(
    args: &[SExp],
    pos: Position,
    ctx: &SourceContext,
    config: &CompileConfig,
    fn_name: Option<&str>,
) -> Result<(Vec<Param>, Vec<Stmt>, bool), HqlError> {
    let (param_list, body_forms) = args.split_first().ok_or_else(|| shape_err(ctx, pos, "(fn (params...) body...)"))?;
    let param_items = param_list.as_list().ok_or_else(|| shape_err(ctx, pos, "a parameter list"))?;

    let uses_named_params = param_items.iter().any(is_named_param)
        || fn_name.is_some_and(|n| config.object_param_fns.contains(n));

    let mut body = Vec::new();
    let params = if uses_named_params && !param_items.is_empty() {
        let fields = param_items.iter().map(object_pattern_field).collect::<Result<Vec<_>, _>>()?;
        body.push(Stmt::Decl(Decl::DestructuringDecl {
            pattern: Pattern::Object(fields),
            init: Expr::Identifier(PARAMS_BINDING.to_string()),
            is_const: true,
        }));
        vec![Param::simple(PARAMS_BINDING.to_string())]
    } else {
        param_items.iter().map(|p| build_param(p, ctx)).collect::<Result<Vec<_>, _>>()?
    };

    body.extend(body_forms.iter().map(|f| build_stmt(f.clone(), ctx, config)).collect::<Result<Vec<_>, _>>()?);
    Ok((params, body, uses_named_params && !param_items.is_empty()))
}

/// A parameter is named iff its surface symbol ends in `:` (`w:`), or it is
/// written as a two-element list `(w: Type)` for a typed named parameter.
fn is_named_param(node: &SExp) -> bool {
    match node.as_symbol() {
        Some(name) => name.ends_with(':'),
        None => node.as_list().is_some_and(|items| {
            items.first().and_then(SExp::as_symbol).is_some_and(|n| n.ends_with(':'))
        }),
    }
}

fn object_pattern_field(node: &SExp) -> Result<ObjectPatternField, HqlError> {
    let bare = node.as_list().and_then(|items| items.first().cloned()).unwrap_or_else(|| node.clone());
    let raw = bare.as_symbol().unwrap_or("").trim_end_matches(':');
    Ok(ObjectPatternField { key: to_camel_case(raw), binding: None, default: None })
}

fn build_param(node: &SExp, ctx: &SourceContext) -> Result<Param, HqlError> {
    if let Some(items) = node.as_list() {
        // `(name Type)` — a typed parameter, surfaced for the TS emitter mode.
        if items.len() == 2 {
            if let Some(name) = items[0].as_symbol() {
                let ty = items[1].as_symbol().map(|s| TypeAnnotation::Named(s.to_string()));
                return Ok(Param { pattern: Pattern::Identifier(to_camel_case(name)), type_annotation: ty, is_rest: false });
            }
        }
    }
    if let Some(name) = node.as_symbol().filter(|n| n.starts_with('&')) {
        let rest_name = name.trim_start_matches('&');
        return Ok(Param { pattern: Pattern::Identifier(to_camel_case(rest_name)), type_annotation: None, is_rest: true });
    }
    let name = camel(node, ctx)?;
    Ok(Param::simple(name))
}

fn build_defenum(args: &[SExp], pos: Position, ctx: &SourceContext) -> Result<Decl, HqlError> {
    let (name_node, variant_nodes) = args.split_first().ok_or_else(|| shape_err(ctx, pos, "(defenum Name variants...)"))?;
    let name = camel(name_node, ctx)?;
    let variants = variant_nodes.iter().map(|v| camel(v, ctx)).collect::<Result<Vec<_>, _>>()?;
    Ok(Decl::EnumDecl { name, variants })
}

/// Canonical shape from the syntax transformer: `(import source specifier*)`
/// where each specifier is `(name)`, `(name alias)`, or `(* name)`.
fn build_import(args: &[SExp], pos: Position, ctx: &SourceContext) -> Result<Decl, HqlError> {
    let (source_node, specifier_nodes) = args.split_first().ok_or_else(|| shape_err(ctx, pos, "(import source ...)"))?;
    let source = match &*source_node.kind {
        SExprKind::Literal(Literal::Str(s)) => s.clone(),
        _ => return Err(shape_err(ctx, pos, "a string import source")),
    };
    let mut specifiers = Vec::new();
    for spec in specifier_nodes {
        let items = spec.as_list().ok_or_else(|| shape_err(ctx, spec.pos, "an import specifier"))?;
        match items {
            [name] => {
                let n = camel(name, ctx)?;
                specifiers.push(ImportSpecifier::Named { imported: n.clone(), local: n });
            }
            [name, alias] if name.as_symbol() != Some("*") => {
                specifiers.push(ImportSpecifier::Named { imported: camel(name, ctx)?, local: camel(alias, ctx)? });
            }
            [star, local] if star.as_symbol() == Some("*") => {
                specifiers.push(ImportSpecifier::Namespace { local: camel(local, ctx)? });
            }
            _ => return Err(shape_err(ctx, spec.pos, "a recognized import specifier")),
        }
    }
    let is_local = !crate::resolve::is_external(&source);
    Ok(Decl::ImportDecl { source, specifiers, is_local })
}

/// `(let (n1 v1 n2 v2 ...) body...)` in ordinary code position has no direct
/// JS expression equivalent; it lowers to a nested block of variable
/// declarations followed by the body statements.
fn build_let_stmt(args: &[SExp], pos: Position, ctx: &SourceContext, config: &CompileConfig) -> Result<Stmt, HqlError> {
    let (bindings_node, body_forms) = args.split_first().ok_or_else(|| shape_err(ctx, pos, "(let (bindings...) body...)"))?;
    let bindings = bindings_node.as_list().ok_or_else(|| shape_err(ctx, pos, "a binding list"))?;
    if bindings.len() % 2 != 0 {
        return Err(shape_err(ctx, pos, "an even-length binding list"));
    }
    let mut stmts = Vec::new();
    for pair in bindings.chunks(2) {
        let name = camel(&pair[0], ctx)?;
        let value = build_expr(pair[1].clone(), ctx, config)?;
        stmts.push(Stmt::Decl(Decl::VariableDecl { name, init: value, is_const: false, type_annotation: None }));
    }
    for (i, form) in body_forms.iter().enumerate() {
        let is_last = i + 1 == body_forms.len();
        if is_last {
            stmts.push(Stmt::Return(Some(build_expr(form.clone(), ctx, config)?)));
        } else {
            stmts.push(build_stmt(form.clone(), ctx, config)?);
        }
    }
    Ok(Stmt::Block(stmts))
}

fn build_expr(node: SExp, ctx: &SourceContext, config: &CompileConfig) -> Result<Expr, HqlError> {
    match &*node.kind {
        SExprKind::Literal(Literal::Str(s)) => Ok(Expr::StringLit(s.clone())),
        SExprKind::Literal(Literal::Num(n)) => Ok(Expr::NumericLit(*n)),
        SExprKind::Literal(Literal::Bool(b)) => Ok(Expr::BooleanLit(*b)),
        SExprKind::Literal(Literal::Nil) => Ok(Expr::NullLit),
        SExprKind::Symbol(name) => Ok(build_symbol_expr(name)),
        SExprKind::List(_) => build_call_like(node, ctx, config),
    }
}

fn build_symbol_expr(name: &str) -> Expr {
    match name.strip_prefix(':') {
        Some(keyword) => Expr::StringLit(format!(":{keyword}")),
        None => Expr::Identifier(to_camel_case(name)),
    }
}

fn build_call_like(node: SExp, ctx: &SourceContext, config: &CompileConfig) -> Result<Expr, HqlError> {
    let pos = node.pos;
    if node.is_empty_list() {
        return Ok(Expr::ArrayLit(vec![]));
    }
    let Some((head, args)) = node.as_call() else {
        return Err(shape_err(ctx, pos, "a call with a symbol head"));
    };
    if ARITHMETIC_OPS.contains(&head) {
        return build_arithmetic(head, args, pos, ctx, config);
    }
    match head {
        "fn" => {
            let (params, body, _is_named_params) = build_function(args, pos, ctx, config, None)?;
            Ok(Expr::FunctionExpr { params, body, return_type: None })
        }
        "list" | "vector" => {
            Ok(Expr::ArrayLit(args.iter().map(|a| build_expr(a.clone(), ctx, config)).collect::<Result<_, _>>()?))
        }
        "hash-map" => build_hash_map(args, pos, ctx, config),
        "get" => build_get(args, pos, ctx, config),
        "js-get" => build_js_get(args, pos, ctx, config),
        "js-call" => build_js_call(args, pos, ctx, config),
        "new" => build_new(args, pos, ctx, config),
        "str" => build_str_concat(args, ctx, config),
        "keyword" => build_keyword(args, pos, ctx),
        _ => build_named_args_call(Expr::Identifier(to_camel_case(head)), args, ctx, config),
    }
}

fn build_arithmetic(op: &str, args: &[SExp], pos: Position, ctx: &SourceContext, config: &CompileConfig) -> Result<Expr, HqlError> {
    let mut operands = args.iter().map(|a| build_expr(a.clone(), ctx, config));
    let first = operands.next().ok_or_else(|| shape_err(ctx, pos, "at least one operand"))??;
    operands.try_fold(first, |acc, next| {
        Ok(Expr::Binary { op: op.to_string(), left: Box::new(acc), right: Box::new(next?) })
    })
}

/// `(hash-map k1 v1 ...)` — every pair lowers to a *computed* property,
/// unlike the plain named-argument object literal.
fn build_hash_map(args: &[SExp], pos: Position, ctx: &SourceContext, config: &CompileConfig) -> Result<Expr, HqlError> {
    if args.len() % 2 != 0 {
        return Err(shape_err(ctx, pos, "an even number of key/value forms"));
    }
    let mut fields = Vec::new();
    for pair in args.chunks(2) {
        let key = build_expr(pair[0].clone(), ctx, config)?;
        let value = build_expr(pair[1].clone(), ctx, config)?;
        fields.push((key, value));
    }
    Ok(Expr::ComputedObjectLit(fields))
}

/// `(get obj prop)`: computed iff `prop` is a string literal.
/// A bare symbol names a static property (`obj.prop`); a string names a
/// dynamically computed one (`obj[expr]`).
fn build_get(args: &[SExp], pos: Position, ctx: &SourceContext, config: &CompileConfig) -> Result<Expr, HqlError> {
    let [object, prop] = args else { return Err(shape_err(ctx, pos, "(get object prop)")) };
    let object = build_expr(object.clone(), ctx, config)?;
    match &*prop.kind {
        SExprKind::Literal(Literal::Str(_)) => {
            let expr = build_expr(prop.clone(), ctx, config)?;
            Ok(Expr::Member { object: Box::new(object), property: PropertyKey::Expr(Box::new(expr)), computed: true })
        }
        SExprKind::Symbol(name) => {
            Ok(Expr::Member { object: Box::new(object), property: PropertyKey::Name(to_camel_case(name)), computed: false })
        }
        _ => {
            let expr = build_expr(prop.clone(), ctx, config)?;
            Ok(Expr::Member { object: Box::new(object), property: PropertyKey::Expr(Box::new(expr)), computed: true })
        }
    }
}

/// `(js-get obj "prop")`, introduced by the syntax transformer for dotted
/// value-position access: always a static string property name.
fn build_js_get(args: &[SExp], pos: Position, ctx: &SourceContext, config: &CompileConfig) -> Result<Expr, HqlError> {
    let [object, prop] = args else { return Err(shape_err(ctx, pos, "(js-get object \"prop\")")) };
    let object = build_expr(object.clone(), ctx, config)?;
    let prop_name = match &*prop.kind {
        SExprKind::Literal(Literal::Str(s)) => s.clone(),
        _ => return Err(shape_err(ctx, prop.pos, "a string property name")),
    };
    Ok(Expr::Member { object: Box::new(object), property: PropertyKey::Name(prop_name), computed: false })
}

fn build_js_call(args: &[SExp], pos: Position, ctx: &SourceContext, config: &CompileConfig) -> Result<Expr, HqlError> {
    let (object_node, rest) = args.split_first().ok_or_else(|| shape_err(ctx, pos, "(js-call object \"method\" args...)"))?;
    let (method_node, call_args) = rest.split_first().ok_or_else(|| shape_err(ctx, pos, "a method name"))?;
    let object = build_expr(object_node.clone(), ctx, config)?;
    let method = match &*method_node.kind {
        SExprKind::Literal(Literal::Str(s)) => s.clone(),
        _ => return Err(shape_err(ctx, method_node.pos, "a string method name")),
    };
    let callee = Expr::Member { object: Box::new(object), property: PropertyKey::Name(method), computed: false };
    build_named_args_call(callee, call_args, ctx, config)
}

/// `(new Ctor args...)` lowers to a call to the `$new` sentinel identifier
/// with the constructor as its first argument; the emitter
/// recognizes the sentinel and rewrites it to a real
/// `NewExpression`.
fn build_new(args: &[SExp], pos: Position, ctx: &SourceContext, config: &CompileConfig) -> Result<Expr, HqlError> {
    let (ctor, call_args) = args.split_first().ok_or_else(|| shape_err(ctx, pos, "(new Ctor args...)"))?;
    let mut all_args = vec![build_expr(ctor.clone(), ctx, config)?];
    for a in call_args {
        all_args.push(build_expr(a.clone(), ctx, config)?);
    }
    Ok(Expr::Call { callee: Box::new(Expr::Identifier("$new".to_string())), args: all_args, is_named_args: false })
}

/// `(str a b c)` → left-associated `a + b + c`.
fn build_str_concat(args: &[SExp], ctx: &SourceContext, config: &CompileConfig) -> Result<Expr, HqlError> {
    let mut parts = args.iter().map(|a| build_expr(a.clone(), ctx, config));
    let first = match parts.next() {
        Some(result) => result?,
        None => Expr::StringLit(String::new()),
    };
    parts.try_fold(first, |acc, next| {
        Ok(Expr::Binary { op: "+".to_string(), left: Box::new(acc), right: Box::new(next?) })
    })
}

fn build_keyword(args: &[SExp], pos: Position, ctx: &SourceContext) -> Result<Expr, HqlError> {
    let [name] = args else { return Err(shape_err(ctx, pos, "(keyword name)")) };
    let name = name.as_symbol().ok_or_else(|| shape_err(ctx, pos, "a symbol keyword name"))?;
    Ok(Expr::StringLit(format!(":{name}")))
}

/// Splits trailing `name: value` pairs from ordinary positional arguments
/// and folds them into one trailing object-literal argument (spec's
/// named-argument convention), setting `is_named_args` when any were found.
fn build_named_args_call(callee: Expr, args: &[SExp], ctx: &SourceContext, config: &CompileConfig) -> Result<Expr, HqlError> {
    let split_at = args.iter().position(is_keyword_marker).unwrap_or(args.len());
    let (positional, rest) = args.split_at(split_at);
    let mut positional_exprs =
        positional.iter().map(|a| build_expr(a.clone(), ctx, config)).collect::<Result<Vec<_>, _>>()?;
    let is_named_args = !rest.is_empty();
    if is_named_args {
        if rest.len() % 2 != 0 {
            return Err(shape_err(ctx, args[0].pos, "keyword arguments in key/value pairs"));
        }
        let mut fields = Vec::new();
        for pair in rest.chunks(2) {
            let key = keyword_name(&pair[0]).ok_or_else(|| shape_err(ctx, pair[0].pos, "a 'name:' argument keyword"))?;
            fields.push((to_camel_case(&key), build_expr(pair[1].clone(), ctx, config)?));
        }
        positional_exprs.push(Expr::ObjectLit(fields));
    }
    Ok(Expr::Call { callee: Box::new(callee), args: positional_exprs, is_named_args })
}

/// A trailing-colon symbol (`w:`) or leading-colon symbol (`:w`) both mark
/// an argument keyword; the lowerer accepts either surface spelling.
fn is_keyword_marker(node: &SExp) -> bool {
    node.as_symbol().is_some_and(|s| s.ends_with(':') || s.starts_with(':'))
}

fn keyword_name(node: &SExp) -> Option<String> {
    let s = node.as_symbol()?;
    Some(s.trim_end_matches(':').trim_start_matches(':').to_string())
}

fn camel(node: &SExp, ctx: &SourceContext) -> Result<String, HqlError> {
    node.as_symbol().map(to_camel_case).ok_or_else(|| shape_err(ctx, node.pos, "a symbol"))
}

fn shape_err(ctx: &SourceContext, pos: Position, expected: &str) -> HqlError {
    HqlError::new(ErrorKind::CodeGenError { node_kind: "ir", reason: format!("expected {expected}") }, ctx, pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FileId;
    use crate::config::CompileConfig;
    use crate::lower::lower_program;
    use crate::parser::parse_program;
    use crate::syntax::desugar_program;

    fn build(src: &str) -> Module {
        let ctx = SourceContext::new("t", src.to_string());
        let forms = parse_program(FileId(0), src).unwrap();
        let forms = desugar_program(forms, &ctx).unwrap();
        let nodes = lower_program(forms, &ctx).unwrap();
        build_module(nodes, &ctx, &CompileConfig::default()).unwrap()
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(to_camel_case("my-variable"), "myVariable");
        assert_eq!(to_camel_case("already_snake"), "alreadySnake");
        assert_eq!(to_camel_case("plain"), "plain");
    }

    #[test]
    fn arithmetic_is_left_associative() {
        let module = build("(+ 1 2 3 4)");
        match &module.body[0] {
            Stmt::Expression(Expr::Binary { op, left, right: _ }) => {
                assert_eq!(op, "+");
                // 4 operands -> 3 internal Binary nodes, left-associated.
                let mut depth = 1;
                let mut cur = left.as_ref();
                while let Expr::Binary { left, .. } = cur {
                    depth += 1;
                    cur = left;
                }
                assert_eq!(depth, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn named_arguments_fold_into_object_literal() {
        let module = build("(make-box w: 10 h: 20)");
        match &module.body[0] {
            Stmt::Expression(Expr::Call { args, is_named_args, .. }) => {
                assert!(is_named_args);
                assert_eq!(args.len(), 1);
                assert!(matches!(&args[0], Expr::ObjectLit(fields) if fields.len() == 2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn def_of_fn_becomes_function_decl() {
        let module = build("(def add (fn (a b) (+ a b)))");
        assert!(matches!(&module.body[0], Stmt::Decl(Decl::FunctionDecl { .. })));
    }

    #[test]
    fn named_parameters_destructure_from_synthetic_params() {
        let module = build("(def area (fn (w: h:) (* w h)))");
        match &module.body[0] {
            Stmt::Decl(Decl::FunctionDecl { params, body, .. }) => {
                assert_eq!(params.len(), 1);
                assert_eq!(params[0].pattern, Pattern::Identifier(PARAMS_BINDING.to_string()));
                assert!(matches!(&body[0], Stmt::Decl(Decl::DestructuringDecl { .. })));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn new_lowers_to_sentinel_call() {
        let module = build("(def x (new Box 1 2))");
        match &module.body[0] {
            Stmt::Decl(Decl::VariableDecl { init: Expr::Call { callee, args, .. }, .. }) => {
                assert_eq!(**callee, Expr::Identifier("$new".to_string()));
                assert_eq!(args.len(), 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn hash_map_properties_are_computed() {
        let module = build("(def m (hash-map \"a\" 1))");
        match &module.body[0] {
            Stmt::Decl(Decl::VariableDecl { init: Expr::ComputedObjectLit(fields), .. }) => {
                assert_eq!(fields.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn def_of_import_becomes_import_decl() {
        let module = build("(def fs (import \"fs\"))");
        match &module.body[0] {
            Stmt::Decl(Decl::ImportDecl { source, is_local, .. }) => {
                assert_eq!(source, "fs");
                assert!(*is_local);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn get_with_string_prop_is_computed_get_with_symbol_is_not() {
        let module = build("(def a (get obj \"prop\")) (def b (get obj prop))");
        match &module.body[0] {
            Stmt::Decl(Decl::VariableDecl { init: Expr::Member { computed, .. }, .. }) => assert!(*computed),
            other => panic!("unexpected {other:?}"),
        }
        match &module.body[1] {
            Stmt::Decl(Decl::VariableDecl { init: Expr::Member { computed, .. }, .. }) => assert!(!*computed),
            other => panic!("unexpected {other:?}"),
        }
    }
}
