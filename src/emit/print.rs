//! A trivial recursive pretty-printer from [`super::JsModule`] to text.
//!
//! A deliberately minimal pretty-printer: good enough to assert output
//! shape in tests, not a production formatter (no line-width wrapping, no
//! comment preservation).

use super::{JsExpr, JsImportSpecifier, JsModule, JsParam, JsPattern, JsPropertyAccess, JsStmt, JsVarKind};

pub fn print_module(module: &JsModule) -> String {
    module.body.iter().map(|s| print_stmt(s, 0)).collect::<Vec<_>>().join("\n")
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn print_stmt(stmt: &JsStmt, depth: usize) -> String {
    let pad = indent(depth);
    match stmt {
        JsStmt::VariableStatement { kind, name, init, type_annotation } => {
            let kw = var_kw(*kind);
            let ty = type_annotation.as_ref().map(|t| format!(": {t}")).unwrap_or_default();
            format!("{pad}{kw} {name}{ty} = {};", print_expr(init))
        }
        JsStmt::DestructuringStatement { kind, pattern, init } => {
            format!("{pad}{} {} = {};", var_kw(*kind), print_pattern(pattern), print_expr(init))
        }
        JsStmt::FunctionDeclaration { name, params, body, return_type } => {
            let ret = return_type.as_ref().map(|t| format!(": {t}")).unwrap_or_default();
            let body_str = print_block(body, depth);
            format!("{pad}function {name}({}){ret} {body_str}", print_params(params))
        }
        JsStmt::EnumDeclaration { name, variants } => {
            let members =
                variants.iter().map(|v| format!("{}  {v} = \"{v}\",", indent(depth + 1))).collect::<Vec<_>>().join("\n");
            format!("{pad}enum {name} {{\n{members}\n{pad}}}")
        }
        JsStmt::ImportDeclaration { source, specifiers } => print_import(source, specifiers, &pad),
        JsStmt::ExportDeclaration { decl } => format!("{pad}export {}", print_stmt(decl, 0).trim_start()),
        JsStmt::ExpressionStatement(e) => format!("{pad}{};", print_expr(e)),
        JsStmt::ReturnStatement(Some(e)) => format!("{pad}return {};", print_expr(e)),
        JsStmt::ReturnStatement(None) => format!("{pad}return;"),
        JsStmt::Block(stmts) => print_block(stmts, depth),
    }
}

fn var_kw(kind: JsVarKind) -> &'static str {
    match kind {
        JsVarKind::Const => "const",
        JsVarKind::Let => "let",
    }
}

fn print_block(stmts: &[JsStmt], depth: usize) -> String {
    if stmts.is_empty() {
        return "{}".to_string();
    }
    let body = stmts.iter().map(|s| print_stmt(s, depth + 1)).collect::<Vec<_>>().join("\n");
    format!("{{\n{body}\n{}}}", indent(depth))
}

fn print_import(source: &str, specifiers: &[JsImportSpecifier], pad: &str) -> String {
    if specifiers.is_empty() {
        return format!("{pad}import \"{source}\";");
    }
    let mut named = Vec::new();
    let mut namespaces = Vec::new();
    for spec in specifiers {
        match spec {
            JsImportSpecifier::Named { imported, local } if imported == local => named.push(imported.clone()),
            JsImportSpecifier::Named { imported, local } => named.push(format!("{imported} as {local}")),
            JsImportSpecifier::Namespace { local } => namespaces.push(format!("* as {local}")),
        }
    }
    let mut clauses = Vec::new();
    if !named.is_empty() {
        clauses.push(format!("{{ {} }}", named.join(", ")));
    }
    clauses.extend(namespaces);
    format!("{pad}import {} from \"{source}\";", clauses.join(", "))
}

fn print_params(params: &[JsParam]) -> String {
    params
        .iter()
        .map(|p| {
            let rest = if p.is_rest { "..." } else { "" };
            let ty = p.type_annotation.as_ref().map(|t| format!(": {t}")).unwrap_or_default();
            format!("{rest}{}{ty}", print_pattern(&p.pattern))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_pattern(pattern: &JsPattern) -> String {
    match pattern {
        JsPattern::Identifier(name) => name.clone(),
        JsPattern::Object(fields) => {
            let inner = fields
                .iter()
                .map(|f| match &f.binding {
                    Some(binding) => format!("{}: {binding}", f.key),
                    None => f.key.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{ {inner} }}")
        }
    }
}

fn print_expr(expr: &JsExpr) -> String {
    match expr {
        JsExpr::Identifier(name) => name.clone(),
        JsExpr::StringLit(s) => format!("{s:?}"),
        JsExpr::TemplateLit(s) => format!("`{s}`"),
        JsExpr::NumericLit(n) => n.to_string(),
        JsExpr::BooleanLit(b) => b.to_string(),
        JsExpr::NullLit => "null".to_string(),
        JsExpr::ArrayLit(items) => format!("[{}]", items.iter().map(print_expr).collect::<Vec<_>>().join(", ")),
        JsExpr::ObjectLit(fields) => {
            let inner = fields.iter().map(|(k, v)| format!("{k}: {}", print_expr(v))).collect::<Vec<_>>().join(", ");
            format!("{{ {inner} }}")
        }
        JsExpr::ComputedObjectLit(fields) => {
            let inner =
                fields.iter().map(|(k, v)| format!("[{}]: {}", print_expr(k), print_expr(v))).collect::<Vec<_>>().join(", ");
            format!("{{ {inner} }}")
        }
        JsExpr::Binary { op, left, right } => format!("({} {op} {})", print_expr(left), print_expr(right)),
        JsExpr::Call { callee, args } => {
            format!("{}({})", print_expr(callee), args.iter().map(print_expr).collect::<Vec<_>>().join(", "))
        }
        JsExpr::New { callee, args } => {
            format!("new {}({})", print_expr(callee), args.iter().map(print_expr).collect::<Vec<_>>().join(", "))
        }
        JsExpr::Member { object, property, computed } => match (computed, property) {
            (false, JsPropertyAccess::Name(name)) => format!("{}.{name}", print_expr(object)),
            (_, JsPropertyAccess::Expr(inner)) => format!("{}[{}]", print_expr(object), print_expr(inner)),
            (true, JsPropertyAccess::Name(name)) => format!("{}[\"{name}\"]", print_expr(object)),
        },
        JsExpr::FunctionExpr { params, body } => format!("function({}) {}", print_params(params), print_block(body, 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileConfig;
    use crate::emit::lower_module;
    use crate::ast::FileId;
    use crate::error::SourceContext;
    use crate::ir::builder::build_module;
    use crate::lower::lower_program;
    use crate::parser::parse_program;
    use crate::syntax::desugar_program;

    fn print_src(src: &str) -> String {
        let ctx = SourceContext::new("t", src.to_string());
        let forms = parse_program(FileId(0), src).unwrap();
        let forms = desugar_program(forms, &ctx).unwrap();
        let nodes = lower_program(forms, &ctx).unwrap();
        let config = CompileConfig::default();
        let module = build_module(nodes, &ctx, &config).unwrap();
        print_module(&lower_module(module, &config))
    }

    #[test]
    fn prints_left_associated_arithmetic() {
        let out = print_src("(def x (+ 1 2 3 4))");
        assert_eq!(out, "const x = (((1 + 2) + 3) + 4);");
    }

    #[test]
    fn empty_source_prints_empty_module() {
        let ctx = SourceContext::new("t", String::new());
        let forms = parse_program(FileId(0), "").unwrap();
        let forms = desugar_program(forms, &ctx).unwrap();
        let nodes = lower_program(forms, &ctx).unwrap();
        let config = CompileConfig::default();
        let module = build_module(nodes, &ctx, &config).unwrap();
        assert_eq!(print_module(&lower_module(module, &config)), "");
    }
}
