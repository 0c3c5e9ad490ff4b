//! The process-wide macro registry.
//!
//! A macro is visible from one of three places, searched in this order for
//! a given `(name, current_file)` pair:
//!
//! 1. `system_macros` — defined with `defmacro`, visible everywhere.
//! 2. `module_macros[current_file]` — defined with `macro` inside that file.
//! 3. `imported_macros[current_file]` — brought in from another file's
//!    `exported_macros`, optionally under an alias.
//!
//! Every name is additionally registered under its hyphen/underscore
//! mirror (`my-macro` and `my_macro` both resolve), matching the sanitized
//! identifier rewriting the lowerer performs when it turns HQL names into
//! valid ECMAScript identifiers. This is a deliberate deviation from a
//! registry that stored a single canonical spelling; see `DESIGN.md`.
//!
//! Lookups are memoized in a small cache keyed on `(current_file, name)`;
//! every mutating operation below invalidates it wholesale rather than
//! trying to reason about which entries it could have affected.

use crate::ast::FileId;
use crate::error::{ErrorKind, HqlError, SourceContext};
use crate::macros::types::MacroTemplate;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

fn sanitized_variants(name: &str) -> [String; 2] {
    [name.replace('-', "_"), name.replace('_', "-")]
}

/// Where a resolved macro came from, for diagnostics and `is_user_level_macro`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroOrigin {
    System,
    Module(FileId),
    Imported(FileId),
}

#[derive(Debug, Clone)]
struct Import {
    source_file: FileId,
    original_name: String,
}

#[derive(Debug, Default)]
pub struct MacroRegistry {
    system_macros: HashMap<String, MacroTemplate>,
    module_macros: HashMap<FileId, HashMap<String, MacroTemplate>>,
    exported_macros: HashMap<FileId, HashSet<String>>,
    /// Keyed by the *importing* file; value maps the locally-visible name
    /// (alias if given, otherwise the original) to where it came from.
    imported_macros: HashMap<FileId, HashMap<String, Import>>,
    macro_aliases: HashMap<FileId, HashMap<String, String>>,
    processed_files: HashSet<FileId>,
    lookup_cache: RefCell<HashMap<(Option<FileId>, String), Option<MacroTemplate>>>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn invalidate_cache(&self) {
        self.lookup_cache.borrow_mut().clear();
    }

    /// Registers a `defmacro`, visible from every file. Redefining the same
    /// name replaces the previous definition; this is the one place
    /// redefinition is *not* a no-op, since system macros have no owning
    /// file to make "already defined" idempotency meaningful.
    pub fn define_system(&mut self, name: &str, template: MacroTemplate) -> Result<(), HqlError> {
        if name.is_empty() {
            return Err(empty_name_error());
        }
        for variant in sanitized_variants(name) {
            self.system_macros.insert(variant, template.clone());
        }
        self.system_macros.insert(name.to_string(), template);
        self.invalidate_cache();
        Ok(())
    }

    /// Registers a `macro`, visible only within `file`. Idempotent:
    /// redefining the same `(file, name)` pair is a silent no-op, so a file
    /// processed twice (e.g. imported from two different modules) doesn't
    /// error on its own macro declarations.
    pub fn define_module(&mut self, file: FileId, name: &str, template: MacroTemplate) -> Result<(), HqlError> {
        if name.is_empty() {
            return Err(empty_name_error());
        }
        let scope = self.module_macros.entry(file).or_default();
        if scope.contains_key(name) {
            return Ok(());
        }
        for variant in sanitized_variants(name) {
            scope.entry(variant).or_insert_with(|| template.clone());
        }
        scope.insert(name.to_string(), template);
        self.invalidate_cache();
        Ok(())
    }

    /// Marks a module macro as importable by other files.
    pub fn export(&mut self, file: FileId, name: &str) -> Result<(), HqlError> {
        let defined = self.module_macros.get(&file).is_some_and(|m| m.contains_key(name));
        if !defined {
            return Err(HqlError::new(
                ErrorKind::MacroError {
                    macro_name: name.to_string(),
                    source_file: Some(format!("file#{}", file.0)),
                },
                &SourceContext::fallback("macro-export"),
                Default::default(),
            ));
        }
        self.exported_macros.entry(file).or_default().insert(name.to_string());
        self.invalidate_cache();
        Ok(())
    }

    /// Imports `name` (optionally under `alias`) from `source_file` into
    /// `into_file`. Importing into the defining file itself is a no-op.
    pub fn import(
        &mut self,
        source_file: FileId,
        name: &str,
        into_file: FileId,
        alias: Option<&str>,
    ) -> Result<(), HqlError> {
        if source_file == into_file {
            return Ok(());
        }
        let exported = self.exported_macros.get(&source_file).is_some_and(|e| e.contains(name));
        if !exported {
            return Err(HqlError::new(
                ErrorKind::MacroError {
                    macro_name: name.to_string(),
                    source_file: Some(format!("file#{}", source_file.0)),
                },
                &SourceContext::fallback("macro-import"),
                Default::default(),
            ));
        }
        let local_name = alias.unwrap_or(name).to_string();
        self.imported_macros
            .entry(into_file)
            .or_default()
            .insert(local_name.clone(), Import { source_file, original_name: name.to_string() });
        if let Some(alias) = alias.filter(|a| *a != name) {
            self.macro_aliases.entry(into_file).or_default().insert(alias.to_string(), name.to_string());
        }
        self.invalidate_cache();
        Ok(())
    }

    pub fn mark_processed(&mut self, file: FileId) {
        self.processed_files.insert(file);
    }

    pub fn is_processed(&self, file: FileId) -> bool {
        self.processed_files.contains(&file)
    }

    /// Resolves `name` against `current_file`'s scope, in the priority order
    /// documented at module level. Never errors: an unresolved name is
    /// simply not a macro, and the caller treats it as a normal call.
    pub fn get(&self, name: &str, current_file: Option<FileId>) -> Option<MacroTemplate> {
        let key = (current_file, name.to_string());
        if let Some(cached) = self.lookup_cache.borrow().get(&key) {
            return cached.clone();
        }
        let resolved = self.resolve(name, current_file);
        self.lookup_cache.borrow_mut().insert(key, resolved.clone());
        resolved
    }

    fn resolve(&self, name: &str, current_file: Option<FileId>) -> Option<MacroTemplate> {
        if let Some(tpl) = self.system_macros.get(name) {
            return Some(tpl.clone());
        }
        let Some(file) = current_file else { return None };
        if let Some(tpl) = self.module_macros.get(&file).and_then(|m| m.get(name)) {
            return Some(tpl.clone());
        }
        let import = self.imported_macros.get(&file)?.get(name)?;
        // Re-verify the export in case it was revoked after the import was recorded.
        let still_exported =
            self.exported_macros.get(&import.source_file).is_some_and(|e| e.contains(&import.original_name));
        if !still_exported {
            return None;
        }
        self.module_macros.get(&import.source_file).and_then(|m| m.get(&import.original_name)).cloned()
    }

    pub fn has_macro(&self, name: &str, current_file: Option<FileId>) -> bool {
        self.get(name, current_file).is_some()
    }

    /// True if `name` names a macro defined or imported in `file`, as
    /// opposed to a system-wide macro — used by the expander's cleanup
    /// pass to decide whether a `defmacro`/`macro` form belongs to this
    /// file's declarations.
    pub fn is_user_level_macro(&self, name: &str, file: FileId) -> bool {
        self.module_macros.get(&file).is_some_and(|m| m.contains_key(name))
            || self.imported_macros.get(&file).is_some_and(|m| m.contains_key(name))
    }

    pub fn origin(&self, name: &str, current_file: Option<FileId>) -> Option<MacroOrigin> {
        if self.system_macros.contains_key(name) {
            return Some(MacroOrigin::System);
        }
        let file = current_file?;
        if self.module_macros.get(&file).is_some_and(|m| m.contains_key(name)) {
            return Some(MacroOrigin::Module(file));
        }
        if self.imported_macros.get(&file).is_some_and(|m| m.contains_key(name)) {
            return Some(MacroOrigin::Imported(file));
        }
        None
    }
}

fn empty_name_error() -> HqlError {
    HqlError::new(
        ErrorKind::ValidationError { expected: "a non-empty macro name".to_string(), found: "empty string".to_string() },
        &SourceContext::fallback("macro-name"),
        Default::default(),
    )
}
