//! Target AST Emitter: lowers [`crate::ir`] into a JS-shaped
//! [`JsModule`] and, via [`print`], the final textual source.
//!
//! Everything HQL-specific is already gone by the time a tree reaches here
//! — `ObjectPattern`s, enums, the `$new` sentinel — this stage's whole job
//! is applying ECMAScript's own surface policies (const-by-default, dot vs
//! bracket member access, template vs plain strings) that the IR stage
//! deliberately left for the emitter to decide.

pub mod print;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{CompileConfig, Target};
use crate::ir;

pub use print::print_module;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsVarKind {
    Const,
    Let,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JsPattern {
    Identifier(String),
    Object(Vec<JsObjectPatternField>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsObjectPatternField {
    pub key: String,
    pub binding: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsParam {
    pub pattern: JsPattern,
    pub type_annotation: Option<String>,
    pub is_rest: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JsImportSpecifier {
    Named { imported: String, local: String },
    Namespace { local: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JsStmt {
    VariableStatement { kind: JsVarKind, name: String, init: JsExpr, type_annotation: Option<String> },
    DestructuringStatement { kind: JsVarKind, pattern: JsPattern, init: JsExpr },
    FunctionDeclaration { name: String, params: Vec<JsParam>, body: Vec<JsStmt>, return_type: Option<String> },
    EnumDeclaration { name: String, variants: Vec<String> },
    ImportDeclaration { source: String, specifiers: Vec<JsImportSpecifier> },
    ExportDeclaration { decl: Box<JsStmt> },
    ExpressionStatement(JsExpr),
    ReturnStatement(Option<JsExpr>),
    Block(Vec<JsStmt>),
}

/// The key half of a [`JsExpr::Member`] once the emitter has decided
/// between dot and bracket notation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JsPropertyAccess {
    Name(String),
    Expr(Box<JsExpr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JsExpr {
    Identifier(String),
    StringLit(String),
    /// A string literal whose content contained `${`, emitted with backticks.
    TemplateLit(String),
    NumericLit(f64),
    BooleanLit(bool),
    NullLit,
    ArrayLit(Vec<JsExpr>),
    ObjectLit(Vec<(String, JsExpr)>),
    ComputedObjectLit(Vec<(JsExpr, JsExpr)>),
    Binary { op: String, left: Box<JsExpr>, right: Box<JsExpr> },
    Call { callee: Box<JsExpr>, args: Vec<JsExpr> },
    /// The `$new` sentinel rewritten: `callee` is the constructor.
    New { callee: Box<JsExpr>, args: Vec<JsExpr> },
    Member { object: Box<JsExpr>, property: JsPropertyAccess, computed: bool },
    FunctionExpr { params: Vec<JsParam>, body: Vec<JsStmt> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsModule {
    pub body: Vec<JsStmt>,
}

/// Property names the emitter always renders with dot notation even when
/// the IR marked the access computed.
const DOT_ALLOWLIST: &[&str] =
    &["length", "push", "pop", "map", "filter", "forEach", "slice", "then", "catch", "name", "value", "default"];

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

fn is_identifier_like(s: &str) -> bool {
    IDENTIFIER_RE.is_match(s)
}

pub fn lower_module(module: ir::Module, config: &CompileConfig) -> JsModule {
    JsModule { body: module.body.into_iter().map(|s| lower_stmt(s, config)).collect() }
}

fn lower_stmt(stmt: ir::Stmt, config: &CompileConfig) -> JsStmt {
    match stmt {
        ir::Stmt::Decl(decl) => lower_decl(decl, config),
        ir::Stmt::Expression(e) => JsStmt::ExpressionStatement(lower_expr(e, config)),
        ir::Stmt::Return(e) => JsStmt::ReturnStatement(e.map(|e| lower_expr(e, config))),
        ir::Stmt::Block(stmts) => JsStmt::Block(stmts.into_iter().map(|s| lower_stmt(s, config)).collect()),
    }
}

fn lower_decl(decl: ir::Decl, config: &CompileConfig) -> JsStmt {
    match decl {
        ir::Decl::VariableDecl { name, init, is_const, type_annotation } => JsStmt::VariableStatement {
            kind: if is_const { JsVarKind::Const } else { JsVarKind::Let },
            name,
            init: lower_expr(init, config),
            type_annotation: lower_type_annotation(type_annotation, config),
        },
        ir::Decl::DestructuringDecl { pattern, init, is_const } => JsStmt::DestructuringStatement {
            kind: if is_const { JsVarKind::Const } else { JsVarKind::Let },
            pattern: lower_pattern(pattern),
            init: lower_expr(init, config),
        },
        ir::Decl::FunctionDecl { name, params, body, return_type, is_anonymous, is_named_params: _ } => {
            let js_params = params.into_iter().map(|p| lower_param(p, config)).collect();
            let js_body = body.into_iter().map(|s| lower_stmt(s, config)).collect();
            let js_return_type = lower_type_annotation(return_type, config);
            if is_anonymous {
                // `const name = function(...) {}`: the anonymous-function-
                // assigned-to-name policy.
                JsStmt::VariableStatement {
                    kind: JsVarKind::Const,
                    name,
                    init: JsExpr::FunctionExpr { params: js_params, body: js_body },
                    type_annotation: js_return_type,
                }
            } else {
                JsStmt::FunctionDeclaration { name, params: js_params, body: js_body, return_type: js_return_type }
            }
        }
        ir::Decl::EnumDecl { name, variants } => JsStmt::EnumDeclaration { name, variants },
        ir::Decl::ImportDecl { source, specifiers, is_local: _ } => JsStmt::ImportDeclaration {
            source,
            specifiers: specifiers
                .into_iter()
                .map(|s| match s {
                    ir::ImportSpecifier::Named { imported, local } => JsImportSpecifier::Named { imported, local },
                    ir::ImportSpecifier::Namespace { local } => JsImportSpecifier::Namespace { local },
                })
                .collect(),
        },
        ir::Decl::ExportDecl { decl } => JsStmt::ExportDeclaration { decl: Box::new(lower_decl(*decl, config)) },
    }
}

fn lower_pattern(pattern: ir::Pattern) -> JsPattern {
    match pattern {
        ir::Pattern::Identifier(name) => JsPattern::Identifier(name),
        ir::Pattern::Object(fields) => JsPattern::Object(
            fields.into_iter().map(|f| JsObjectPatternField { key: f.key, binding: f.binding }).collect(),
        ),
    }
}

fn lower_param(param: ir::Param, config: &CompileConfig) -> JsParam {
    JsParam {
        pattern: lower_pattern(param.pattern),
        type_annotation: lower_type_annotation(param.type_annotation, config),
        is_rest: param.is_rest,
    }
}

/// JS drops type annotations; TS preserves what the IR carried and leaves
/// absent ones absent (resolved Open Question — see DESIGN.md).
fn lower_type_annotation(annotation: Option<ir::TypeAnnotation>, config: &CompileConfig) -> Option<String> {
    if config.target != Target::Ts {
        return None;
    }
    annotation.map(render_type_annotation)
}

fn render_type_annotation(annotation: ir::TypeAnnotation) -> String {
    match annotation {
        ir::TypeAnnotation::Named(name) => name,
        ir::TypeAnnotation::Array(inner) => format!("{}[]", render_type_annotation(*inner)),
        ir::TypeAnnotation::Any => "any".to_string(),
    }
}

fn lower_expr(expr: ir::Expr, config: &CompileConfig) -> JsExpr {
    match expr {
        ir::Expr::Identifier(name) => JsExpr::Identifier(name),
        ir::Expr::StringLit(s) => {
            if s.contains("${") {
                JsExpr::TemplateLit(s)
            } else {
                JsExpr::StringLit(s)
            }
        }
        ir::Expr::NumericLit(n) => JsExpr::NumericLit(n),
        ir::Expr::BooleanLit(b) => JsExpr::BooleanLit(b),
        ir::Expr::NullLit => JsExpr::NullLit,
        ir::Expr::ArrayLit(items) => JsExpr::ArrayLit(items.into_iter().map(|e| lower_expr(e, config)).collect()),
        ir::Expr::ObjectLit(fields) => {
            JsExpr::ObjectLit(fields.into_iter().map(|(k, v)| (k, lower_expr(v, config))).collect())
        }
        ir::Expr::ComputedObjectLit(fields) => JsExpr::ComputedObjectLit(
            fields.into_iter().map(|(k, v)| (lower_expr(k, config), lower_expr(v, config))).collect(),
        ),
        ir::Expr::ObjectPattern(fields) => {
            // Only reachable if an `ObjectPattern` ever escapes into an
            // expression position; render it as the object literal it would
            // destructure from so `print` still produces valid output.
            JsExpr::ObjectLit(
                fields.into_iter().map(|f| (f.key.clone(), JsExpr::Identifier(f.binding.unwrap_or(f.key)))).collect(),
            )
        }
        ir::Expr::Binary { op, left, right } => {
            JsExpr::Binary { op, left: Box::new(lower_expr(*left, config)), right: Box::new(lower_expr(*right, config)) }
        }
        ir::Expr::Call { callee, mut args, is_named_args: _ } => {
            if let ir::Expr::Identifier(name) = callee.as_ref() {
                if name == "$new" && !args.is_empty() {
                    let ctor = lower_expr(args.remove(0), config);
                    let rest = args.into_iter().map(|a| lower_expr(a, config)).collect();
                    return JsExpr::New { callee: Box::new(ctor), args: rest };
                }
            }
            JsExpr::Call {
                callee: Box::new(lower_expr(*callee, config)),
                args: args.into_iter().map(|a| lower_expr(a, config)).collect(),
            }
        }
        ir::Expr::Member { object, property, computed } => lower_member(*object, property, computed, config),
        ir::Expr::FunctionExpr { params, body, return_type: _ } => JsExpr::FunctionExpr {
            params: params.into_iter().map(|p| lower_param(p, config)).collect(),
            body: body.into_iter().map(|s| lower_stmt(s, config)).collect(),
        },
    }
}

/// The member-access policy: dot notation whenever the
/// property is a static identifier-like name (whether or not the IR marked
/// it computed), bracket notation otherwise.
fn lower_member(object: ir::Expr, property: ir::PropertyKey, computed: bool, config: &CompileConfig) -> JsExpr {
    let js_object = Box::new(lower_expr(object, config));
    if !computed {
        if let ir::PropertyKey::Name(name) = property {
            return JsExpr::Member { object: js_object, property: JsPropertyAccess::Name(name), computed: false };
        }
    }
    match property {
        ir::PropertyKey::Name(name) => JsExpr::Member { object: js_object, property: JsPropertyAccess::Name(name), computed: false },
        ir::PropertyKey::Expr(inner) => {
            if let ir::Expr::StringLit(name) = inner.as_ref() {
                if is_identifier_like(name) || DOT_ALLOWLIST.contains(&name.as_str()) {
                    return JsExpr::Member {
                        object: js_object,
                        property: JsPropertyAccess::Name(name.clone()),
                        computed: false,
                    };
                }
            }
            JsExpr::Member {
                object: js_object,
                property: JsPropertyAccess::Expr(Box::new(lower_expr(*inner, config))),
                computed: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FileId;
    use crate::error::SourceContext;
    use crate::ir::builder::build_module;
    use crate::lower::lower_program;
    use crate::parser::parse_program;
    use crate::syntax::desugar_program;

    fn emit_src(src: &str, config: &CompileConfig) -> JsModule {
        let ctx = SourceContext::new("t", src.to_string());
        let forms = parse_program(FileId(0), src).unwrap();
        let forms = desugar_program(forms, &ctx).unwrap();
        let nodes = lower_program(forms, &ctx).unwrap();
        let module = build_module(nodes, &ctx, config).unwrap();
        lower_module(module, config)
    }

    #[test]
    fn anonymous_function_assigned_to_name_becomes_const_function_expr() {
        let module = emit_src("(def add (fn (a b) (+ a b)))", &CompileConfig::default());
        match &module.body[0] {
            JsStmt::VariableStatement { kind, init: JsExpr::FunctionExpr { .. }, .. } => assert_eq!(*kind, JsVarKind::Const),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn new_sentinel_becomes_new_expression() {
        let module = emit_src("(def x (new Box 1 2))", &CompileConfig::default());
        match &module.body[0] {
            JsStmt::VariableStatement { init: JsExpr::New { args, .. }, .. } => assert_eq!(args.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn template_string_detection() {
        let module = emit_src(r#"(def x "hi ${name}")"#, &CompileConfig::default());
        match &module.body[0] {
            JsStmt::VariableStatement { init: JsExpr::TemplateLit(_), .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn computed_string_property_matching_identifier_renders_as_dot() {
        let module = emit_src(r#"(def a (get obj "prop"))"#, &CompileConfig::default());
        match &module.body[0] {
            JsStmt::VariableStatement { init: JsExpr::Member { computed, property, .. }, .. } => {
                assert!(!computed);
                assert_eq!(*property, JsPropertyAccess::Name("prop".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn type_annotations_dropped_for_js_target_preserved_for_ts() {
        let js = emit_src("(def x 1)", &CompileConfig { target: Target::Js, ..CompileConfig::default() });
        let ts = emit_src("(def x 1)", &CompileConfig { target: Target::Ts, ..CompileConfig::default() });
        assert!(matches!(&js.body[0], JsStmt::VariableStatement { type_annotation: None, .. }));
        assert!(matches!(&ts.body[0], JsStmt::VariableStatement { .. }));
    }
}
