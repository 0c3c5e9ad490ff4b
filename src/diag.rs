//! Ergonomic construction macros for [`crate::error::HqlError`].
//!
//! Call sites should almost never build `HqlError` field-by-field; these two
//! macros cover the common shapes (message only, message + source + span).

/// Builds an `HqlError` for a context that has no source/span available
/// (e.g. a pure-logic invariant check inside the macro evaluator).
#[macro_export]
macro_rules! err_msg {
    ($kind:expr) => {{
        let ctx = $crate::error::SourceContext::fallback(stringify!($kind));
        $crate::error::HqlError::new($kind, &ctx, $crate::ast::Position::default())
    }};
}

/// Builds an `HqlError` with a source context and a span.
#[macro_export]
macro_rules! err_ctx {
    ($kind:expr, $ctx:expr, $pos:expr) => {{
        $crate::error::HqlError::new($kind, $ctx, $pos)
    }};
    ($kind:expr, $ctx:expr, $pos:expr, $help:expr) => {{
        $crate::error::HqlError::new($kind, $ctx, $pos).with_help($help)
    }};
}
