//! The macro-body interpreter.
//!
//! A macro's body is not substituted textually; it is *evaluated* by this
//! small tree-walker, which understands literals, symbol lookup, `quote`,
//! `quasiquote`/`unquote`/`unquote-splicing`, `if`, `cond`, `let`, calling
//! other macros, and a fixed table of host functions. `def`/`defn`/`fn`
//! evaluate to `nil`: a macro body that incidentally contains one (because
//! it was copied from ordinary HQL code) does not error, it just contributes
//! nothing.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{FileId, Literal, Position, SExp, SExprKind};
use crate::error::{ErrorKind, HqlError, SourceContext};
use crate::macros::registry::MacroRegistry;

/// A macro-evaluation-time value. Unevaluated arguments and quoted data both
/// travel as `SExp`; only `quasiquote`'s own bookkeeping needs the other
/// variants.
#[derive(Debug, Clone)]
pub enum Value {
    SExp(SExp),
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
    List(Vec<Value>),
}

impl Value {
    fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Nil)
    }
}

/// A lexical scope in the interpreter: a frame of bindings plus an optional
/// parent, mirroring the nested `let` scopes a macro body can introduce.
pub struct EvalEnv {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<EvalEnv>>,
}

impl EvalEnv {
    pub fn root() -> Rc<EvalEnv> {
        Rc::new(EvalEnv { vars: RefCell::new(HashMap::new()), parent: None })
    }

    pub fn child(parent: &Rc<EvalEnv>) -> Rc<EvalEnv> {
        Rc::new(EvalEnv { vars: RefCell::new(HashMap::new()), parent: Some(Rc::clone(parent)) })
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.vars.borrow().get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }
}

/// Converts an evaluated value back into the `SExp` the expander needs to
/// splice into the surrounding program.
pub fn value_to_sexp(value: &Value, pos: Position) -> SExp {
    match value {
        Value::SExp(node) => node.clone(),
        Value::Number(n) => SExp::literal(Literal::Num(*n), pos),
        Value::Str(s) => SExp::literal(Literal::Str(s.clone()), pos),
        Value::Bool(b) => SExp::literal(Literal::Bool(*b), pos),
        Value::Nil => SExp::literal(Literal::Nil, pos),
        Value::List(items) => {
            let nodes = items.iter().map(|v| value_to_sexp(v, pos)).collect();
            SExp::list(nodes, pos)
        }
    }
}

const MAX_EVAL_DEPTH: usize = 256;

/// Evaluates one macro-body expression in `env`.
pub fn eval(
    expr: &SExp,
    env: &Rc<EvalEnv>,
    registry: &MacroRegistry,
    current_file: Option<FileId>,
    ctx: &SourceContext,
    depth: usize,
) -> Result<Value, HqlError> {
    if depth > MAX_EVAL_DEPTH {
        return Err(transform_err(ctx, expr.pos, "macro-eval recursion limit exceeded"));
    }
    match &*expr.kind {
        SExprKind::Literal(Literal::Num(n)) => Ok(Value::Number(*n)),
        SExprKind::Literal(Literal::Str(s)) => Ok(Value::Str(s.clone())),
        SExprKind::Literal(Literal::Bool(b)) => Ok(Value::Bool(*b)),
        SExprKind::Literal(Literal::Nil) => Ok(Value::Nil),
        SExprKind::Symbol(name) => env
            .get(name)
            .ok_or_else(|| transform_err(ctx, expr.pos, &format!("undefined name '{name}' in macro body"))),
        SExprKind::List(items) if items.is_empty() => Ok(Value::List(vec![])),
        SExprKind::List(items) => eval_list(expr, items, env, registry, current_file, ctx, depth),
    }
}

fn eval_list(
    whole: &SExp,
    items: &[SExp],
    env: &Rc<EvalEnv>,
    registry: &MacroRegistry,
    current_file: Option<FileId>,
    ctx: &SourceContext,
    depth: usize,
) -> Result<Value, HqlError> {
    let pos = whole.pos;
    let Some(head) = items[0].as_symbol() else {
        return Err(transform_err(ctx, pos, "call head must be a symbol in macro-evaluation context"));
    };
    match head {
        "quote" => {
            require_arity(ctx, pos, items, 2)?;
            Ok(Value::SExp(items[1].clone()))
        }
        "quasiquote" => {
            require_arity(ctx, pos, items, 2)?;
            eval_quasiquote(&items[1], env, registry, current_file, ctx, depth + 1)
        }
        "if" => {
            require_arity(ctx, pos, items, 4)?;
            let cond = eval(&items[1], env, registry, current_file, ctx, depth + 1)?;
            if cond.is_truthy() {
                eval(&items[2], env, registry, current_file, ctx, depth + 1)
            } else {
                eval(&items[3], env, registry, current_file, ctx, depth + 1)
            }
        }
        "cond" => eval_cond(&items[1..], env, registry, current_file, ctx, depth + 1),
        "let" => eval_let(items, pos, env, registry, current_file, ctx, depth + 1),
        "def" | "defn" | "fn" => Ok(Value::Nil),
        _ => eval_call(whole, head, &items[1..], env, registry, current_file, ctx, depth),
    }
}

fn eval_cond(
    clauses: &[SExp],
    env: &Rc<EvalEnv>,
    registry: &MacroRegistry,
    current_file: Option<FileId>,
    ctx: &SourceContext,
    depth: usize,
) -> Result<Value, HqlError> {
    for clause in clauses {
        let pair = clause
            .as_list()
            .filter(|c| c.len() == 2)
            .ok_or_else(|| transform_err(ctx, clause.pos, "cond clause must be (test expr)"))?;
        let is_else = pair[0].as_symbol() == Some("else");
        let test = if is_else { Value::Bool(true) } else { eval(&pair[0], env, registry, current_file, ctx, depth)? };
        if test.is_truthy() {
            return eval(&pair[1], env, registry, current_file, ctx, depth);
        }
    }
    Ok(Value::Nil)
}

/// `(let (n1 v1 n2 v2 ...) body...)`: a flat, sequentially-bound list of
/// name/value pairs, not the canonical `((n1 v1) (n2 v2))` shape — this is
/// the interpreter's own ad hoc binding form, distinct from the `let` the
/// IR builder lowers in ordinary HQL code.
fn eval_let(
    items: &[SExp],
    pos: Position,
    env: &Rc<EvalEnv>,
    registry: &MacroRegistry,
    current_file: Option<FileId>,
    ctx: &SourceContext,
    depth: usize,
) -> Result<Value, HqlError> {
    if items.len() < 2 {
        return Err(transform_err(ctx, pos, "let requires a binding list"));
    }
    let bindings = items[1].as_list().ok_or_else(|| transform_err(ctx, pos, "let bindings must be a list"))?;
    if bindings.len() % 2 != 0 {
        return Err(transform_err(ctx, pos, "let bindings of odd length"));
    }
    let child = EvalEnv::child(env);
    for pair in bindings.chunks(2) {
        let name = pair[0]
            .as_symbol()
            .ok_or_else(|| transform_err(ctx, pair[0].pos, "let binding name must be a symbol"))?;
        let value = eval(&pair[1], &child, registry, current_file, ctx, depth)?;
        child.define(name, value);
    }
    let mut result = Value::Nil;
    for body_expr in &items[2..] {
        result = eval(body_expr, &child, registry, current_file, ctx, depth)?;
    }
    Ok(result)
}

/// Applies `head` as either another macro (expanded with its *unevaluated*
/// arguments, then recursively evaluated) or a host function (its arguments
/// evaluated first).
fn eval_call(
    whole: &SExp,
    head: &str,
    arg_forms: &[SExp],
    env: &Rc<EvalEnv>,
    registry: &MacroRegistry,
    current_file: Option<FileId>,
    ctx: &SourceContext,
    depth: usize,
) -> Result<Value, HqlError> {
    if let Some(template) = registry.get(head, current_file) {
        let expansion = super::expander::apply_template(&template, arg_forms, whole.pos, registry, current_file, ctx)?;
        return eval(&expansion, env, registry, current_file, ctx, depth + 1);
    }
    let mut args = Vec::with_capacity(arg_forms.len());
    for form in arg_forms {
        args.push(eval(form, env, registry, current_file, ctx, depth + 1)?);
    }
    call_host(head, &args, ctx, whole.pos)
}

fn eval_quasiquote(
    expr: &SExp,
    env: &Rc<EvalEnv>,
    registry: &MacroRegistry,
    current_file: Option<FileId>,
    ctx: &SourceContext,
    depth: usize,
) -> Result<Value, HqlError> {
    if let Some((head, rest)) = expr.as_call() {
        if head == "unquote" && rest.len() == 1 {
            return eval(&rest[0], env, registry, current_file, ctx, depth);
        }
    }
    match &*expr.kind {
        SExprKind::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some((head, rest)) = item.as_call() {
                    if head == "unquote-splicing" && rest.len() == 1 {
                        let spliced = eval(&rest[0], env, registry, current_file, ctx, depth)?;
                        match spliced {
                            Value::List(values) => out.extend(values),
                            Value::SExp(node) => match node.into_list() {
                                Some(elems) => out.extend(elems.into_iter().map(Value::SExp)),
                                None => {
                                    return Err(transform_err(
                                        ctx,
                                        item.pos,
                                        "unquote-splicing target is not a list",
                                    ))
                                }
                            },
                            _ => return Err(transform_err(ctx, item.pos, "unquote-splicing target is not a list")),
                        }
                        continue;
                    }
                }
                out.push(eval_quasiquote(item, env, registry, current_file, ctx, depth)?);
            }
            Ok(Value::SExp(value_to_sexp(&Value::List(out), expr.pos)))
        }
        _ => Ok(Value::SExp(expr.clone())),
    }
}

fn call_host(name: &str, args: &[Value], ctx: &SourceContext, pos: Position) -> Result<Value, HqlError> {
    fn num(v: &Value, ctx: &SourceContext, pos: Position) -> Result<f64, HqlError> {
        match v {
            Value::Number(n) => Ok(*n),
            other => Err(transform_err(ctx, pos, &format!("expected number, found {}", describe(other)))),
        }
    }
    match name {
        "+" => Ok(Value::Number(args.iter().map(|a| num(a, ctx, pos)).collect::<Result<Vec<_>, _>>()?.iter().sum())),
        "*" => {
            Ok(Value::Number(args.iter().map(|a| num(a, ctx, pos)).collect::<Result<Vec<_>, _>>()?.iter().product()))
        }
        "-" => {
            let nums = args.iter().map(|a| num(a, ctx, pos)).collect::<Result<Vec<_>, _>>()?;
            match nums.split_first() {
                None => Ok(Value::Number(0.0)),
                Some((first, [])) => Ok(Value::Number(-first)),
                Some((first, rest)) => Ok(Value::Number(rest.iter().fold(*first, |a, b| a - b))),
            }
        }
        "/" => {
            let nums = args.iter().map(|a| num(a, ctx, pos)).collect::<Result<Vec<_>, _>>()?;
            match nums.split_first() {
                None | Some((_, [])) => Err(transform_err(ctx, pos, "/ requires at least two arguments")),
                Some((first, rest)) => Ok(Value::Number(rest.iter().fold(*first, |a, b| a / b))),
            }
        }
        "=" => Ok(Value::Bool(args.windows(2).all(|w| values_equal(&w[0], &w[1])))),
        "<" => compare(args, ctx, pos, |a, b| a < b),
        ">" => compare(args, ctx, pos, |a, b| a > b),
        "<=" => compare(args, ctx, pos, |a, b| a <= b),
        ">=" => compare(args, ctx, pos, |a, b| a >= b),
        "and" => Ok(Value::Bool(args.iter().all(Value::is_truthy))),
        "or" => Ok(Value::Bool(args.iter().any(Value::is_truthy))),
        "not" => Ok(Value::Bool(!args.first().is_some_and(Value::is_truthy))),
        "list" => Ok(Value::List(args.to_vec())),
        "cons" => {
            let [head, tail] = args else {
                return Err(transform_err(ctx, pos, "cons requires exactly two arguments"));
            };
            let mut items = vec![head.clone()];
            match tail {
                Value::List(rest) => items.extend(rest.clone()),
                other => items.push(other.clone()),
            }
            Ok(Value::List(items))
        }
        "first" => as_list(args, ctx, pos)?.first().cloned().ok_or_else(|| transform_err(ctx, pos, "first of empty list")),
        "rest" => Ok(Value::List(as_list(args, ctx, pos)?.get(1..).unwrap_or_default().to_vec())),
        other => Err(transform_err(ctx, pos, &format!("unknown macro or function '{other}' in macro-evaluation context"))),
    }
}

fn as_list<'a>(args: &'a [Value], ctx: &SourceContext, pos: Position) -> Result<&'a [Value], HqlError> {
    match args.first() {
        Some(Value::List(items)) => Ok(items.as_slice()),
        _ => Err(transform_err(ctx, pos, "expected a list argument")),
    }
}

fn compare(args: &[Value], ctx: &SourceContext, pos: Position, op: fn(f64, f64) -> bool) -> Result<Value, HqlError> {
    let nums: Vec<f64> = args
        .iter()
        .map(|a| match a {
            Value::Number(n) => Ok(*n),
            other => Err(transform_err(ctx, pos, &format!("expected number, found {}", describe(other)))),
        })
        .collect::<Result<_, _>>()?;
    Ok(Value::Bool(nums.windows(2).all(|w| op(w[0], w[1]))))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Nil, Value::Nil) => true,
        (Value::SExp(x), Value::SExp(y)) => x.to_key_string() == y.to_key_string(),
        _ => false,
    }
}

fn describe(v: &Value) -> &'static str {
    match v {
        Value::SExp(_) => "s-expression",
        Value::Number(_) => "number",
        Value::Str(_) => "string",
        Value::Bool(_) => "bool",
        Value::Nil => "nil",
        Value::List(_) => "list",
    }
}

fn require_arity(ctx: &SourceContext, pos: Position, items: &[SExp], expected: usize) -> Result<(), HqlError> {
    if items.len() != expected {
        return Err(transform_err(
            ctx,
            pos,
            &format!("'{}' expects {} form(s), found {}", items[0].as_symbol().unwrap_or("?"), expected, items.len()),
        ));
    }
    Ok(())
}

fn transform_err(ctx: &SourceContext, pos: Position, reason: &str) -> HqlError {
    HqlError::new(ErrorKind::TransformError { offending_form: reason.to_string(), stage: "macro-eval" }, ctx, pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FileId;
    use crate::parser::parse_program;

    fn eval_src(src: &str) -> Value {
        let ctx = SourceContext::new("t", src.to_string());
        let forms = parse_program(FileId(0), src).unwrap();
        let registry = MacroRegistry::new();
        eval(&forms[0], &EvalEnv::root(), &registry, None, &ctx, 0).unwrap()
    }

    #[test]
    fn arithmetic_host_functions() {
        assert!(matches!(eval_src("(+ 1 2 3)"), Value::Number(n) if n == 6.0));
        assert!(matches!(eval_src("(* 2 3 4)"), Value::Number(n) if n == 24.0));
        assert!(matches!(eval_src("(- 10 3 2)"), Value::Number(n) if n == 5.0));
    }

    #[test]
    fn if_and_cond() {
        assert!(matches!(eval_src("(if true 1 2)"), Value::Number(n) if n == 1.0));
        assert!(matches!(eval_src("(cond (false 1) (true 2) (else 3))"), Value::Number(n) if n == 2.0));
    }

    #[test]
    fn let_sequential_binding() {
        assert!(matches!(eval_src("(let (a 1 b 2) (+ a b))"), Value::Number(n) if n == 3.0));
    }

    #[test]
    fn quote_yields_unevaluated_form() {
        match eval_src("(quote (a b c))") {
            Value::SExp(node) => assert_eq!(node.as_list().unwrap().len(), 3),
            other => panic!("expected SExp, got {other:?}"),
        }
    }
}
