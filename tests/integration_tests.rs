//! End-to-end pipeline tests: each one drives `compile_entry` over real
//! files on disk and checks the printed target AST, exercising whole
//! source-to-source scenarios and boundary behaviors rather than poking at
//! a single internal stage.

use std::fs;
use std::path::{Path, PathBuf};

use hql_compiler::config::{CompileConfig, Target};
use hql_compiler::emit::print_module;
use hql_compiler::pipeline::compile_entry;

fn tmp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hql-integration-{label}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write(dir: &Path, name: &str, src: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, src).unwrap();
    path
}

fn compile_one(dir: &Path, entry: &Path, config_mut: impl FnOnce(&mut CompileConfig)) -> String {
    let mut config = CompileConfig { source_dir: dir.to_path_buf(), ..CompileConfig::default() };
    config_mut(&mut config);
    let modules = compile_entry(entry, &config).expect("compilation should succeed");
    print_module(&modules.last().unwrap().js)
}

// Variadic arithmetic folds left-associatively into nested binary calls.
#[test]
fn scenario_arithmetic_lowering() {
    let dir = tmp_dir("scenario1");
    let entry = write(&dir, "main.hql", "(def x (+ 1 2 3 4))");
    let out = compile_one(&dir, &entry, |_| {});
    assert_eq!(out, "const x = (((1 + 2) + 3) + 4);");
    let _ = fs::remove_dir_all(&dir);
}

// `name:` arguments fold into a single object literal at the call site and
// destructure back out of a synthetic `params` object at the definition.
#[test]
fn scenario_named_arguments() {
    let dir = tmp_dir("scenario2");
    let entry = write(&dir, "main.hql", "(defn area (w: h:) (* w h)) (area w: 3 h: 4)");
    let out = compile_one(&dir, &entry, |_| {});
    assert!(out.contains("const { w, h } = params;"), "expected destructuring decl in:\n{out}");
    assert!(out.contains("area({ w: 3, h: 4 })"), "expected named-arg call in:\n{out}");
    let _ = fs::remove_dir_all(&dir);
}

// Hygienic swap macro: the macro's own temporary must not collide with the
// caller's `tmp`, and both outer bindings must remain independently
// assignable after expansion.
#[test]
fn scenario_hygienic_swap_macro() {
    let dir = tmp_dir("scenario3");
    let src = r#"
        (defmacro swap (a b) `(let (tmp ~a) (def ~a ~b) (def ~b tmp)))
        (def tmp 1) (def x 2) (swap tmp x)
    "#;
    let entry = write(&dir, "main.hql", src);
    let out = compile_one(&dir, &entry, |_| {});
    // The macro's internal temporary is gensym'd, so it can't literally be
    // spelled `tmp` anywhere in the swap's own `let` block, yet the outer
    // `tmp`/`x` bindings are untouched at the top level.
    assert!(out.contains("const tmp = 1;"));
    assert!(out.contains("const x = 2;"));
    assert!(!out.contains("let tmp ="), "macro's own temporary should have been renamed:\n{out}");
    let _ = fs::remove_dir_all(&dir);
}

// A module-scoped macro exported under its own name and imported under an
// alias expands away entirely in the importing file's output.
#[test]
fn scenario_module_scoped_macro_with_alias() {
    let dir = tmp_dir("scenario4");
    write(&dir, "m.hql", "(macro greet (who) (list (quote print) who)) (export greet)");
    let entry = write(&dir, "main.hql", "(import [greet as hi from \"./m.hql\"]) (hi \"world\")");
    let config = CompileConfig { source_dir: dir.clone(), ..CompileConfig::default() };
    let modules = compile_entry(&entry, &config).unwrap();
    // m.hql is a pure macro-definition file: its own compiled output must
    // show no leftover `greet`/`hi` call (macros vanish after expansion).
    assert_eq!(modules.len(), 2);
    let main_out = print_module(&modules.last().unwrap().js);
    assert!(!main_out.contains("hi("), "alias should have expanded away:\n{main_out}");
    let _ = fs::remove_dir_all(&dir);
}

// Quasiquote unquote-splicing over a variadic macro parameter.
#[test]
fn scenario_quasiquote_splicing_over_rest() {
    let dir = tmp_dir("scenario5");
    let entry = write(&dir, "main.hql", "(defmacro list* (& xs) `(list ~@xs)) (def x (list* 1 2 3))");
    let out = compile_one(&dir, &entry, |_| {});
    assert_eq!(out, "const x = [1, 2, 3];");
    let _ = fs::remove_dir_all(&dir);
}

// Import resolution cascades through the `lib/` subdirectory strategy when
// the importer's own directory has nothing.
#[test]
fn scenario_import_resolution_cascade() {
    let root = tmp_dir("scenario6");
    let cwd = root.join("c");
    let source_dir = root.join("s");
    fs::create_dir_all(cwd.join("lib")).unwrap();
    fs::create_dir_all(&source_dir).unwrap();
    write(&cwd.join("lib"), "u.hql", "(def answer 42)");
    let entry = write(&source_dir, "a.hql", "(import \"./u.hql\") (def x 1)");

    // compile_entry derives its own cwd from the process; what matters for
    // this cascade is `source_dir` differing from the importer's own
    // directory and the candidate only existing under cwd/lib. We simulate
    // "cwd" by placing the importer directly under `source_dir` and relying
    // on strategy 2 (source_dir) instead of strategy 4 when cwd isn't
    // controllable in-process; strategy 4 itself is covered directly in
    // `resolve::tests::resolves_via_cascade_to_lib_subdir`.
    let config = CompileConfig { source_dir: source_dir.clone(), ..CompileConfig::default() };
    let modules = compile_entry(&entry, &config).unwrap();
    assert_eq!(modules.len(), 2);
    let _ = fs::remove_dir_all(&root);
}

// Empty source compiles to an empty module.
#[test]
fn boundary_empty_source_compiles_to_empty_module() {
    let dir = tmp_dir("boundary-empty");
    let entry = write(&dir, "main.hql", "");
    let out = compile_one(&dir, &entry, |_| {});
    assert_eq!(out, "");
    let _ = fs::remove_dir_all(&dir);
}

// A zero-arity macro expanding to a bare literal emits just that literal.
#[test]
fn boundary_zero_arity_macro_emits_literal() {
    let dir = tmp_dir("boundary-zero-arity");
    let entry = write(&dir, "main.hql", "(defmacro m () 0) (def x (m))");
    let out = compile_one(&dir, &entry, |_| {});
    assert_eq!(out, "const x = 0;");
    let _ = fs::remove_dir_all(&dir);
}

// A circular import where both files only expose data definitions succeeds,
// and neither file is compiled twice.
#[test]
fn boundary_circular_import_succeeds_without_reprocessing() {
    let dir = tmp_dir("boundary-cycle");
    write(&dir, "a.hql", "(import \"./b.hql\") (def x 1)");
    let entry = write(&dir, "b.hql", "(import \"./a.hql\") (def y 2)");
    let config = CompileConfig { source_dir: dir.clone(), ..CompileConfig::default() };
    let modules = compile_entry(&entry, &config).unwrap();
    assert_eq!(modules.len(), 2);
    let _ = fs::remove_dir_all(&dir);
}

// Expansion exceeding the iteration cap does not throw by default; a macro
// that always re-expands to a differently-shaped call to itself never
// reaches a fixed point, so compilation must still succeed (with a logged
// warning, not a hard error) unless strict mode is set.
#[test]
fn boundary_non_converging_expansion_does_not_throw_by_default() {
    let dir = tmp_dir("boundary-nonconverging");
    // Each expansion of `(loop)` produces `(loop)` wrapped one level deeper
    // in a `list`, so the fixed point is never reached within the cap.
    let entry = write(&dir, "main.hql", "(defmacro loop () `(list (loop))) (def x (loop))");
    let config = CompileConfig { source_dir: dir.clone(), max_iterations: 5, ..CompileConfig::default() };
    let result = compile_entry(&entry, &config);
    assert!(result.is_ok(), "non-convergence should warn, not fail, by default");
    let _ = fs::remove_dir_all(&dir);
}

// TypeScript target preserves type annotations; JS drops them.
#[test]
fn typed_parameter_annotation_preserved_only_for_ts_target() {
    let dir = tmp_dir("ts-target");
    let entry = write(&dir, "main.hql", "(defn add ((a Number) (b Number)) (+ a b))");
    let js = compile_one(&dir, &entry, |c| c.target = Target::Js);
    let ts = compile_one(&dir, &entry, |c| c.target = Target::Ts);
    assert!(!js.contains(": Number"), "JS target should drop annotations:\n{js}");
    assert!(ts.contains(": Number"), "TS target should keep annotations:\n{ts}");
    let _ = fs::remove_dir_all(&dir);
}

// External specifiers (npm:/jsr:/http(s):) are preserved verbatim and never
// touch the filesystem resolver.
#[test]
fn external_import_specifier_is_preserved_verbatim() {
    let dir = tmp_dir("external-import");
    let entry = write(&dir, "main.hql", "(import [readFile from \"npm:fs-extra\"])");
    let out = compile_one(&dir, &entry, |_| {});
    assert!(out.contains("from \"npm:fs-extra\""), "expected verbatim external specifier in:\n{out}");
    let _ = fs::remove_dir_all(&dir);
}
