//! Logging bootstrap.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,depot_assets=debug";

/// Install a global fmt subscriber.
///
/// Honors `RUST_LOG` and falls back to [`DEFAULT_FILTER`]. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Install a subscriber that writes through the test harness capture.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("trace"))
        .with_test_writer()
        .try_init();
}
