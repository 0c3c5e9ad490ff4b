//! Import path resolution and the file graph walk.
//!
//! Given an importer's directory and a module specifier, five strategies
//! are tried to find the file on disk; the first one whose candidate path
//! exists wins. `npm:`/`jsr:`/`http:`/`https:` specifiers are external and
//! returned unchanged for the downstream bundler.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use crate::ast::FileId;
use crate::error::{ErrorKind, HqlError, SourceContext};

const EXTERNAL_PREFIXES: &[&str] = &["npm:", "jsr:", "http:", "https:"];

pub fn is_external(specifier: &str) -> bool {
    EXTERNAL_PREFIXES.iter().any(|p| specifier.starts_with(p))
}

/// Everything the resolver needs to know about where a compilation started.
pub struct ResolveContext {
    pub source_dir: PathBuf,
    pub cwd: PathBuf,
}

/// A resolved local module, or a marker that it is external and should be
/// left to the downstream bundler.
pub enum Resolved {
    Local(PathBuf),
    External(String),
}

/// Tries every resolution strategy concurrently and returns the first that
/// exists on disk.
pub fn resolve_module(
    specifier: &str,
    importer_dir: &Path,
    ctx: &ResolveContext,
) -> Result<Resolved, ImportFailure> {
    if is_external(specifier) {
        return Ok(Resolved::External(specifier.to_string()));
    }
    let candidates = vec![
        importer_dir.join(specifier),
        ctx.source_dir.join(specifier),
        ctx.cwd.join(specifier),
        ctx.cwd.join("lib").join(specifier),
        ctx.cwd.join("examples").join(specifier),
    ];
    match first_existing(&candidates) {
        Some(path) => {
            tracing::debug!(specifier, resolved = %path.display(), "import resolved");
            Ok(Resolved::Local(path))
        }
        None => {
            tracing::warn!(specifier, tried = candidates.len(), "import resolution exhausted all strategies");
            Err(ImportFailure { tried: candidates })
        }
    }
}

pub struct ImportFailure {
    pub tried: Vec<PathBuf>,
}

impl ImportFailure {
    pub fn into_error(self, specifier: &str, importer: Option<&str>, ctx: &SourceContext) -> HqlError {
        HqlError::new(
            ErrorKind::ImportError {
                path: specifier.to_string(),
                importer: importer.map(str::to_string),
                tried: self.tried,
            },
            ctx,
            Default::default(),
        )
    }
}

/// Probes N candidate paths concurrently (one OS thread per candidate) and
/// returns the first one observed to exist, short-circuiting the rest.
pub fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    if candidates.is_empty() {
        return None;
    }
    let (tx, rx) = mpsc::channel();
    thread::scope(|scope| {
        for candidate in candidates {
            let tx = tx.clone();
            scope.spawn(move || {
                if candidate.exists() {
                    let _ = tx.send(candidate.clone());
                }
            });
        }
        drop(tx);
        // First strategy in declared order wins on a tie: collect all
        // winners and pick the earliest index rather than racing on
        // arrival order.
        let mut winners = Vec::new();
        while let Ok(path) = rx.recv() {
            winners.push(path);
        }
        candidates.iter().find(|c| winners.contains(c)).cloned()
    })
}

/// Tracks interned `FileId`s by canonicalized path so the same file is
/// never assigned two ids.
#[derive(Debug, Default)]
pub struct FileTable {
    by_path: HashMap<PathBuf, FileId>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, path: &Path) -> FileId {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        *self.by_path.entry(key).or_insert_with(FileId::next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn external_specifiers_are_not_resolved_on_disk() {
        assert!(is_external("npm:lodash"));
        assert!(is_external("https://example.com/x.js"));
        assert!(!is_external("./local.hql"));
    }

    #[test]
    fn resolves_via_cascade_to_lib_subdir() {
        let tmp = std::env::temp_dir().join(format!("hql-resolve-test-{}", std::process::id()));
        let _ = fs::remove_dir_all(&tmp);
        let cwd = tmp.join("c");
        let src_dir = tmp.join("s");
        fs::create_dir_all(cwd.join("lib")).unwrap();
        fs::create_dir_all(&src_dir).unwrap();
        fs::write(cwd.join("lib").join("u.hql"), "").unwrap();

        let ctx = ResolveContext { source_dir: src_dir.clone(), cwd: cwd.clone() };
        let importer_dir = src_dir.join("a_dir");
        fs::create_dir_all(&importer_dir).unwrap();

        let resolved = resolve_module("u.hql", &importer_dir, &ctx).ok().unwrap();
        match resolved {
            Resolved::Local(p) => assert_eq!(p, cwd.join("lib").join("u.hql")),
            Resolved::External(_) => panic!("expected local resolution"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_module_reports_every_candidate_tried() {
        let ctx = ResolveContext { source_dir: PathBuf::from("/nonexistent-s"), cwd: PathBuf::from("/nonexistent-c") };
        let err = resolve_module("missing.hql", Path::new("/nonexistent-importer"), &ctx).err().unwrap();
        assert_eq!(err.tried.len(), 5);
    }
}
