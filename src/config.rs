//! Compiler configuration, threaded explicitly through the
//! pipeline rather than held in a global — every stage that needs a limit
//! or a policy knob takes a `&CompileConfig` argument instead of reaching
//! for ambient state.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::macros::MacroLimits;

/// The two ECMAScript-family surfaces the emitter can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    Js,
    Ts,
}

#[derive(Debug, Clone)]
pub struct CompileConfig {
    pub target: Target,
    pub max_iterations: usize,
    pub max_depth: usize,
    pub macro_cache_capacity: usize,
    /// Promotes ordinarily-recoverable macro-expansion warnings (a
    /// non-converging fixed point, a redefined system macro) to hard
    /// errors for callers that want strictness.
    pub strict_macro_errors: bool,
    pub source_dir: PathBuf,
    /// Function names whose trailing keyword/value arguments should fold
    /// into an object-literal parameter; also
    /// governs which function *declarations* render an `{ a, b }`
    /// destructured `ObjectPattern` parameter instead of individual ones.
    pub object_param_fns: HashSet<String>,
    /// URL prefix substituted for bare specifiers HQL treats as
    /// standard-library imports (e.g. `"list"` → `"{prefix}list"`).
    pub stdlib_url_prefix: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            target: Target::Js,
            max_iterations: 100,
            max_depth: 100,
            macro_cache_capacity: 5000,
            strict_macro_errors: false,
            source_dir: PathBuf::from("."),
            object_param_fns: HashSet::new(),
            stdlib_url_prefix: "https://deno.land/std/".to_string(),
        }
    }
}

impl CompileConfig {
    pub fn macro_limits(&self) -> MacroLimits {
        MacroLimits {
            max_iterations: self.max_iterations,
            max_depth: self.max_depth,
            cache_capacity: self.macro_cache_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_limits() {
        let config = CompileConfig::default();
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.max_depth, 100);
        assert_eq!(config.macro_cache_capacity, 5000);
        assert_eq!(config.target, Target::Js);
    }

    #[test]
    fn macro_limits_mirror_config() {
        let mut config = CompileConfig::default();
        config.max_iterations = 7;
        let limits = config.macro_limits();
        assert_eq!(limits.max_iterations, 7);
    }
}
