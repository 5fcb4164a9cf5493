//! `tracing` targets and helpers shared by the tabula crates.
//!
//! The library only emits events; output appears once the application
//! installs a subscriber:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("tabula::proxy=debug,tabula::persistent=trace")
//!         .init();
//! }
//! ```
//!
//! Each subsystem logs under its own target (see [`targets`]) so that the
//! registry rewrite chatter can be enabled independently of proxy rebuilds.

/// One target per subsystem, for use in `RUST_LOG`-style directives.
pub mod targets {
    /// Signal/slot delivery.
    pub const SIGNAL: &str = "tabula_core::signal";
    /// Model base: edit brackets, resets, notifications.
    pub const MODEL: &str = "tabula::model";
    /// Persistent index registry rewrites.
    pub const PERSISTENT: &str = "tabula::persistent";
    /// Proxy mapping construction, filtering and sorting.
    pub const PROXY: &str = "tabula::proxy";
    /// Timing spans emitted by [`PerfSpan`](super::PerfSpan).
    pub const PERF: &str = "tabula::perf";
}

/// Debug span under [`targets::PERF`], entered for as long as the value
/// lives. A subscriber with span timing reports how long the work took.
#[derive(Debug)]
pub struct PerfSpan {
    _entered: tracing::span::EnteredSpan,
}

impl PerfSpan {
    pub fn new(operation: &'static str) -> Self {
        Self {
            _entered: tracing::debug_span!(target: "tabula::perf", "perf", operation).entered(),
        }
    }
}

/// Trace-level event under the model target.
#[macro_export]
macro_rules! model_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "tabula::model", $($arg)*)
    };
}

/// Debug-level event under the model target.
#[macro_export]
macro_rules! model_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "tabula::model", $($arg)*)
    };
}

/// Error-level event under the model target.
#[macro_export]
macro_rules! model_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "tabula::model", $($arg)*)
    };
}
