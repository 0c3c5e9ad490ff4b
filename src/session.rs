//! Process-wide identifier generation.
//!
//! A single monotonic counter backs every gensym produced during a
//! compilation run, regardless of which file or macro invocation asked for
//! one. This is deliberately simpler than a per-session `Environment`
//! object: nothing about gensym uniqueness depends on which file is being
//! compiled, so there is nothing to reset between files.

use std::sync::atomic::{AtomicU32, Ordering};

static GENSYM_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Mints `{prefix}_{n}` for a fresh, monotonically increasing `n`.
pub fn gensym(prefix: &str) -> String {
    let n = GENSYM_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{n}")
}

/// `gensym` with the default `"g"` prefix, for call sites with no natural name.
pub fn gensym_default() -> String {
    gensym("g")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gensyms_are_distinct() {
        let a = gensym("tmp");
        let b = gensym("tmp");
        assert_ne!(a, b);
        assert!(a.starts_with("tmp_"));
    }
}
