//! Subscriber wiring for the billing engine's tracing output.
//!
//! Engine operations are instrumented with spans and the commit/decline paths
//! emit structured events; this installs the JSON subscriber they land in.

use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber, honoring `RUST_LOG`.
///
/// Falls back to `info` when no filter is configured. Calling this twice is
/// harmless; only the first subscriber wins.
pub fn init() {
    init_with_default_filter("info");
}

/// Install the subscriber with an explicit fallback filter.
///
/// `RUST_LOG` still takes precedence when set; `fallback` applies otherwise
/// (e.g. `"blockbill_infra=debug"` while debugging settlement).
pub fn init_with_default_filter(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
