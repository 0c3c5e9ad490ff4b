//! Orchestrates L→P→S→I→X→H→G→T for one compilation unit and for the whole
//! import graph an entry file reaches.
//!
//! Within a file, phases run in the fixed order the component table
//! names. Across files, import resolution is a DAG walk: a file's own
//! macro expansion cannot begin until every local file it imports has
//! finished its collection phase, so any macro it exports is already in
//! the Registry by the time this file's expander looks it up.
//! Cycles are broken by the Registry's `processed_files` plus an
//! in-progress set here: revisiting a file already in progress is a
//! no-op, not an error — self- and mutual imports just see the file's id.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ast::{FileId, Literal, SExp, SExprKind};
use crate::config::CompileConfig;
use crate::emit::{self, JsModule};
use crate::error::{ErrorKind, HqlError, SourceContext};
use crate::ir::builder::build_module;
use crate::lower::lower_program;
use crate::macros::expand_program;
use crate::macros::registry::MacroRegistry;
use crate::parser::parse_program;
use crate::resolve::{self, FileTable, ResolveContext, Resolved};
use crate::syntax::desugar_program;

/// One file's fully compiled output.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub file: FileId,
    pub path: PathBuf,
    pub js: JsModule,
}

struct Session {
    table: FileTable,
    resolve_ctx: ResolveContext,
    registry: MacroRegistry,
    in_progress: HashSet<FileId>,
    output: Vec<CompiledModule>,
}

/// Compiles `entry` and the whole local file graph it reaches, in
/// dependency order. The entry file's own module is always last.
pub fn compile_entry(entry: &Path, config: &CompileConfig) -> Result<Vec<CompiledModule>, HqlError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut session = Session {
        table: FileTable::new(),
        resolve_ctx: ResolveContext { source_dir: config.source_dir.clone(), cwd },
        registry: MacroRegistry::new(),
        in_progress: HashSet::new(),
        output: Vec::new(),
    };
    compile_file(entry, &mut session, config)?;
    Ok(session.output)
}

fn compile_file(path: &Path, session: &mut Session, config: &CompileConfig) -> Result<FileId, HqlError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let file = session.table.intern(&canonical);

    if session.registry.is_processed(file) {
        return Ok(file);
    }
    if !session.in_progress.insert(file) {
        return Ok(file);
    }

    let text = fs::read_to_string(&canonical).map_err(|e| {
        HqlError::new(
            ErrorKind::ImportError { path: path.display().to_string(), importer: None, tried: vec![canonical.clone()] },
            &SourceContext::fallback("read-source"),
            Default::default(),
        )
        .with_help(e.to_string())
    })?;
    let ctx = SourceContext::new(canonical.display().to_string(), text.clone());

    let tokens_forms = parse_program(file, &text)?;
    let forms = desugar_program(tokens_forms, &ctx)?;

    let importer_dir = canonical.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    for form in &forms {
        process_import(form, &importer_dir, file, session, config, &ctx)?;
    }

    let limits = config.macro_limits();
    let expanded = expand_program(forms, &mut session.registry, Some(file), &ctx, &limits)?;
    let lowered = lower_program(expanded, &ctx)?;
    let ir_module = build_module(lowered, &ctx, config)?;
    let js_module = emit::lower_module(ir_module, config);

    session.registry.mark_processed(file);
    session.in_progress.remove(&file);
    session.output.push(CompiledModule { file, path: canonical, js: js_module });
    Ok(file)
}

/// If `form` is a canonical `(import source specifier*)`, resolves and
/// compiles the target file first (so its exports land in the Registry),
/// then imports any specifier that names one of that file's exported
/// macros into `into_file`, under its alias if one was given.
fn process_import(
    form: &SExp,
    importer_dir: &Path,
    into_file: FileId,
    session: &mut Session,
    config: &CompileConfig,
    ctx: &SourceContext,
) -> Result<(), HqlError> {
    let Some(("import", args)) = form.as_call() else { return Ok(()) };
    let Some((source_node, specifier_nodes)) = args.split_first() else { return Ok(()) };
    let source = match &*source_node.kind {
        SExprKind::Literal(Literal::Str(s)) => s.clone(),
        _ => return Ok(()),
    };
    if resolve::is_external(&source) {
        return Ok(());
    }
    let resolved = resolve::resolve_module(&source, importer_dir, &session.resolve_ctx)
        .map_err(|e| e.into_error(&source, Some(&ctx.name), ctx))?;
    let Resolved::Local(dep_path) = resolved else { return Ok(()) };
    let dep_file = compile_file(&dep_path, session, config)?;

    for spec in specifier_nodes {
        let Some(items) = spec.as_list() else { continue };
        let (name, alias) = match items {
            [name] => (name.as_symbol(), None),
            [name, alias] if name.as_symbol() != Some("*") => (name.as_symbol(), alias.as_symbol()),
            _ => continue,
        };
        if let Some(name) = name {
            if session.registry.has_macro(name, Some(dep_file)) {
                session.registry.import(dep_file, name, into_file, alias)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, src: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, src).unwrap();
        path
    }

    fn tmp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hql-pipeline-test-{label}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn empty_source_compiles_to_empty_module() {
        let dir = tmp_dir("empty");
        let entry = write(&dir, "main.hql", "");
        let config = CompileConfig { source_dir: dir.clone(), ..CompileConfig::default() };
        let out = compile_entry(&entry, &config).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].js.body.is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn arithmetic_lowers_left_associated() {
        let dir = tmp_dir("arith");
        let entry = write(&dir, "main.hql", "(def x (+ 1 2 3 4))");
        let config = CompileConfig { source_dir: dir.clone(), ..CompileConfig::default() };
        let out = compile_entry(&entry, &config).unwrap();
        assert_eq!(emit::print_module(&out[0].js), "const x = (((1 + 2) + 3) + 4);");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn module_scoped_macro_is_importable_with_alias_across_files() {
        let dir = tmp_dir("macro-import");
        write(&dir, "m.hql", "(macro greet (who) (list (quote print) who)) (export greet)");
        let entry = write(&dir, "main.hql", "(import [greet as hi from \"./m.hql\"]) (hi \"world\")");
        let config = CompileConfig { source_dir: dir.clone(), ..CompileConfig::default() };
        let out = compile_entry(&entry, &config).unwrap();
        // main.hql is compiled last; its module must show the macro call
        // already expanded away into a plain call, not a leftover `hi(...)`.
        let main = out.last().unwrap();
        assert_eq!(out.len(), 2);
        let printed = emit::print_module(&main.js);
        assert!(!printed.contains("hi("), "macro call should have expanded: {printed}");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn circular_import_succeeds_without_reprocessing() {
        let dir = tmp_dir("cycle");
        write(&dir, "a.hql", "(import \"./b.hql\") (def x 1)");
        let entry = write(&dir, "b.hql", "(import \"./a.hql\") (def y 2)");
        let config = CompileConfig { source_dir: dir.clone(), ..CompileConfig::default() };
        let out = compile_entry(&entry, &config).unwrap();
        assert_eq!(out.len(), 2);
        let _ = fs::remove_dir_all(&dir);
    }
}
