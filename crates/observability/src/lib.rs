//! Logging/tracing setup shared by anything embedding the billing engine.

/// Subscriber wiring (env filter, JSON output).
pub mod tracing;

/// Initialize process-wide observability.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}

pub use tracing::init_with_default_filter;
