//! Fixed-point macro expansion and hygiene.
//!
//! Expansion runs in three phases over one file's top-level forms:
//!
//! 1. **Collection** — every top-level `(defmacro ...)`/`(macro ...)` is
//!    registered and then dropped from further consideration as data.
//! 2. **Fixed point** — every remaining form is rewritten bottom-up,
//!    replacing macro calls with their expansions, until a pass produces no
//!    change or `max_iterations` passes have run.
//! 3. **Cleanup** — any `defmacro`/`macro` form still present (there
//!    shouldn't be any outside top level, but nested macro definitions are
//!    not an error, just inert) is filtered from the final sequence.
//!
//! Hygiene is applied once per macro invocation, before the template body is
//! evaluated: every name a `let` inside the template introduces (and which
//! is not itself one of the macro's parameters) is alpha-renamed to a fresh
//! gensym. A parameter reference substituted via `unquote` carries the
//! caller's own spelling through untouched, so a macro's internal temporary
//! can never capture a binding the caller passed in — see the `swap` test
//! below.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::ast::{FileId, Position, SExp, SExprKind};
use crate::error::{ErrorKind, HqlError, SourceContext};
use crate::macros::eval::{eval, value_to_sexp, EvalEnv, Value};
use crate::macros::registry::MacroRegistry;
use crate::macros::types::{MacroTemplate, ParamList};
use crate::session::gensym;

#[derive(Debug, Clone, Copy)]
pub struct MacroLimits {
    pub max_iterations: usize,
    pub max_depth: usize,
    pub cache_capacity: usize,
}

impl Default for MacroLimits {
    fn default() -> Self {
        Self { max_iterations: 100, max_depth: 100, cache_capacity: 5000 }
    }
}

/// A capacity-bounded cache from a macro call's textual form to its
/// one-step expansion. Eviction is by insertion/touch order: the resident
/// set after any sequence of operations is exactly the most recently
/// touched `capacity` keys.
struct ExpansionCache {
    capacity: usize,
    order: VecDeque<String>,
    entries: HashMap<String, SExp>,
}

impl ExpansionCache {
    fn new(capacity: usize) -> Self {
        Self { capacity, order: VecDeque::new(), entries: HashMap::new() }
    }

    fn get(&mut self, key: &str) -> Option<SExp> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, value: SExp) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key.clone(), value);
            self.touch(&key);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
            self.order.push_back(key.to_string());
        }
    }
}

pub fn expand_program(
    forms: Vec<SExp>,
    registry: &mut MacroRegistry,
    current_file: Option<FileId>,
    ctx: &SourceContext,
    limits: &MacroLimits,
) -> Result<Vec<SExp>, HqlError> {
    for form in &forms {
        collect_definition(form, registry, current_file, ctx)?;
    }

    let mut cache = ExpansionCache::new(limits.cache_capacity);
    let mut current = forms;
    let mut converged = false;
    for iteration in 0..limits.max_iterations {
        let next = current
            .iter()
            .map(|f| expand_expr(f, registry, current_file, ctx, limits, &mut cache, 0))
            .collect::<Result<Vec<_>, _>>()?;
        let same = current.len() == next.len()
            && current.iter().zip(next.iter()).all(|(a, b)| a.to_key_string() == b.to_key_string());
        current = next;
        if same {
            tracing::trace!(iteration, "macro expansion reached a fixed point");
            converged = true;
            break;
        }
    }
    if !converged {
        tracing::warn!(iterations = limits.max_iterations, "macro expansion did not reach a fixed point");
    }

    Ok(current.into_iter().filter(|f| !is_macro_definition_form(f) && !is_macro_export_form(f, registry, current_file)).collect())
}

fn is_macro_definition_form(node: &SExp) -> bool {
    matches!(node.as_call(), Some(("defmacro", _)) | Some(("macro", _)))
}

/// `(export name)` — a single bare symbol, distinct from the two-argument
/// `(export name value)` data export — declares `name` exportable from
/// the current file's macro namespace. Registered during collection, then
/// dropped here so it never reaches the IR builder, which only knows the
/// data form.
fn is_macro_export_form(node: &SExp, registry: &MacroRegistry, current_file: Option<FileId>) -> bool {
    let Some(("export", args)) = node.as_call() else { return false };
    let [only] = args else { return false };
    let Some(name) = only.as_symbol() else { return false };
    let Some(file) = current_file else { return false };
    registry.is_user_level_macro(name, file)
}

fn collect_definition(
    form: &SExp,
    registry: &mut MacroRegistry,
    current_file: Option<FileId>,
    ctx: &SourceContext,
) -> Result<(), HqlError> {
    let Some((head, rest)) = form.as_call() else { return Ok(()) };
    match head {
        "defmacro" => {
            let (name, template) = parse_macro_form(rest, form.pos, ctx)?;
            registry.define_system(&name, template)
        }
        "macro" => {
            let (name, template) = parse_macro_form(rest, form.pos, ctx)?;
            match current_file {
                Some(file) => registry.define_module(file, &name, template),
                None => Err(shape_err(ctx, form.pos, "a file context for a module-scoped macro")),
            }
        }
        "export" => {
            let ([name_node], Some(file)) = (rest, current_file) else { return Ok(()) };
            let Some(name) = name_node.as_symbol() else { return Ok(()) };
            if registry.is_user_level_macro(name, file) {
                registry.export(file, name)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn parse_macro_form(rest: &[SExp], pos: Position, ctx: &SourceContext) -> Result<(String, MacroTemplate), HqlError> {
    let [name_node, params_node, body] = rest else {
        return Err(shape_err(ctx, pos, "(defmacro name (params...) body)"));
    };
    let name = name_node.as_symbol().ok_or_else(|| shape_err(ctx, pos, "a symbol macro name"))?.to_string();
    let param_items = params_node.as_list().ok_or_else(|| shape_err(ctx, pos, "a parameter list"))?;
    let params = parse_param_list(param_items, pos, ctx)?;
    let template = MacroTemplate::new(params, body.clone(), ctx)?;
    Ok((name, template))
}

fn parse_param_list(items: &[SExp], pos: Position, ctx: &SourceContext) -> Result<ParamList, HqlError> {
    let mut required = Vec::new();
    let mut rest = None;
    let mut i = 0;
    while i < items.len() {
        let name = items[i].as_symbol().ok_or_else(|| shape_err(ctx, pos, "a symbol parameter name"))?;
        // Both the bare `&` and `&rest` name the variadic parameter marker —
        // some call sites spell it one way, some the other, and neither is
        // treated as more canonical than the other.
        if name == "&" || name == "&rest" {
            let rest_name = items.get(i + 1).and_then(SExp::as_symbol).ok_or_else(|| {
                shape_err(ctx, pos, "a name following the rest marker")
            })?;
            rest = Some(rest_name.to_string());
            i += 2;
        } else {
            required.push(name.to_string());
            i += 1;
        }
    }
    Ok(ParamList { required, rest })
}

fn expand_expr(
    node: &SExp,
    registry: &mut MacroRegistry,
    current_file: Option<FileId>,
    ctx: &SourceContext,
    limits: &MacroLimits,
    cache: &mut ExpansionCache,
    depth: usize,
) -> Result<SExp, HqlError> {
    let items = match &*node.kind {
        SExprKind::List(items) if !items.is_empty() => items,
        _ => return Ok(node.clone()),
    };
    if let Some(head) = items[0].as_symbol() {
        if registry.has_macro(head, current_file) {
            if depth > limits.max_depth {
                return Err(transform_err(ctx, node.pos, "macro expansion depth limit exceeded"));
            }
            let key = node.to_key_string();
            let expansion = match cache.get(&key) {
                Some(cached) => cached,
                None => {
                    let template = registry.get(head, current_file).expect("has_macro just confirmed presence");
                    let result = apply_template(&template, &items[1..], node.pos, registry, current_file, ctx)?;
                    cache.insert(key, result.clone());
                    result
                }
            };
            return expand_expr(&expansion, registry, current_file, ctx, limits, cache, depth + 1);
        }
    }
    let new_items =
        items.iter().map(|i| expand_expr(i, registry, current_file, ctx, limits, cache, depth)).collect::<Result<Vec<_>, _>>()?;
    Ok(SExp::list(new_items, node.pos))
}

/// Binds `args` to `template`'s parameters, applies hygiene to its body,
/// evaluates it, and converts the result back to an `SExp`. Also the entry
/// point a macro body uses (via `macros::eval::eval_call`) to invoke another
/// macro from inside its own evaluation.
pub fn apply_template(
    template: &MacroTemplate,
    args: &[SExp],
    call_pos: Position,
    registry: &MacroRegistry,
    current_file: Option<FileId>,
    ctx: &SourceContext,
) -> Result<SExp, HqlError> {
    check_arity(template, args, call_pos, ctx)?;

    let param_names: HashSet<&str> = template.params.names().collect();
    let bound_names = find_let_bound_names(&template.body, &param_names);
    let rename: HashMap<String, String> = bound_names.into_iter().map(|n| (n.clone(), gensym(&n))).collect();
    let body = if rename.is_empty() { template.body.clone() } else { rename_symbols(&template.body, &rename) };

    let env = EvalEnv::root();
    for (i, name) in template.params.required.iter().enumerate() {
        env.define(name.clone(), Value::SExp(args[i].clone()));
    }
    if let Some(rest_name) = &template.params.rest {
        let rest_args: Vec<Value> =
            args[template.params.required.len()..].iter().map(|a| Value::SExp(a.clone())).collect();
        env.define(rest_name.clone(), Value::List(rest_args));
    }

    let value = eval(&body, &env, registry, current_file, ctx, 0)?;
    Ok(value_to_sexp(&value, call_pos))
}

fn check_arity(template: &MacroTemplate, args: &[SExp], pos: Position, ctx: &SourceContext) -> Result<(), HqlError> {
    let required = template.params.required.len();
    let ok = if template.params.rest.is_some() { args.len() >= required } else { args.len() == required };
    if ok {
        return Ok(());
    }
    Err(HqlError::new(
        ErrorKind::ValidationError {
            expected: format!("{} argument(s)", template.params.arity_description()),
            found: format!("{}", args.len()),
        },
        ctx,
        pos,
    ))
}

/// Collects every name bound by a `let` inside `body` that is not one of
/// the macro's own parameters. These are the names hygiene must rename:
/// identifiers the macro author introduced, as opposed to references to
/// the caller's arguments (which arrive via `unquote` and are never
/// touched here).
fn find_let_bound_names(body: &SExp, param_names: &HashSet<&str>) -> Vec<String> {
    let mut found = Vec::new();
    walk_for_let_names(body, param_names, &mut found);
    found
}

fn walk_for_let_names(node: &SExp, param_names: &HashSet<&str>, found: &mut Vec<String>) {
    let Some(items) = node.as_list() else { return };
    if let Some(head) = items.first().and_then(SExp::as_symbol) {
        if head == "let" {
            if let Some(bindings) = items.get(1).and_then(SExp::as_list) {
                for pair in bindings.chunks(2) {
                    if let Some(name) = pair[0].as_symbol() {
                        if !param_names.contains(name) && !found.iter().any(|f| f == name) {
                            found.push(name.to_string());
                        }
                    }
                }
            }
        }
    }
    for item in items {
        walk_for_let_names(item, param_names, found);
    }
}

fn rename_symbols(node: &SExp, rename: &HashMap<String, String>) -> SExp {
    match &*node.kind {
        SExprKind::Symbol(name) => match rename.get(name) {
            Some(renamed) => SExp::symbol(renamed.clone(), node.pos),
            None => node.clone(),
        },
        SExprKind::List(items) => {
            let renamed = items.iter().map(|i| rename_symbols(i, rename)).collect();
            SExp::list(renamed, node.pos)
        }
        SExprKind::Literal(_) => node.clone(),
    }
}

fn shape_err(ctx: &SourceContext, pos: Position, expected: &str) -> HqlError {
    HqlError::new(ErrorKind::ValidationError { expected: expected.to_string(), found: "unrecognized shape".to_string() }, ctx, pos)
}

fn transform_err(ctx: &SourceContext, pos: Position, reason: &str) -> HqlError {
    HqlError::new(ErrorKind::TransformError { offending_form: reason.to_string(), stage: "macro-expand" }, ctx, pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FileId;
    use crate::parser::parse_program;

    fn expand_src(src: &str) -> Vec<SExp> {
        let ctx = SourceContext::new("t", src.to_string());
        let forms = parse_program(FileId(0), src).unwrap();
        let mut registry = MacroRegistry::new();
        expand_program(forms, &mut registry, Some(FileId(0)), &ctx, &MacroLimits::default()).unwrap()
    }

    #[test]
    fn defmacro_form_is_stripped_from_output() {
        let out = expand_src("(defmacro double (x) `(+ ~x ~x)) (double 5)");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn simple_macro_expands_via_quasiquote() {
        let out = expand_src("(defmacro double (x) `(+ ~x ~x)) (double 5)");
        let (head, args) = out[0].as_call().unwrap();
        assert_eq!(head, "+");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn hygienic_swap_does_not_capture_caller_binding() {
        let out = expand_src(
            r#"(defmacro swap (a b) `(let (tmp ~a) (def ~a ~b) (def ~b tmp)))
               (swap outer-tmp x)"#,
        );
        let (head, items) = out[0].as_call().unwrap();
        assert_eq!(head, "let");
        let bindings = items[0].as_list().unwrap();
        // The macro's own temporary was renamed; the caller's `outer-tmp`
        // reference (substituted via ~a) survives untouched.
        let local_temp_name = bindings[0].as_symbol().unwrap();
        assert_ne!(local_temp_name, "outer-tmp");
        assert_eq!(bindings[1].as_symbol(), Some("outer-tmp"));
        let def_x = items[2].as_call().unwrap();
        assert_eq!(def_x.1[0].as_symbol(), Some("x"));
        assert_eq!(def_x.1[1].as_symbol(), Some(local_temp_name));
    }

    #[test]
    fn unquote_splicing_over_rest_parameter() {
        let out = expand_src(
            r#"(defmacro wrap (&rest xs) `(list ~@xs))
               (wrap 1 2 3)"#,
        );
        let (head, args) = out[0].as_call().unwrap();
        assert_eq!(head, "list");
        assert_eq!(args.len(), 3);
    }
}
