//! Profiling utilities based on the `puffin` crate.
//!
//! The asset crates mark their pool, tracker and package entry points with
//! [`profile_function!`]; scopes are only recorded once profiling is enabled.

use std::sync::OnceLock;

pub use puffin::{GlobalProfiler, profile_function, profile_scope};

/// Default address the puffin HTTP server binds to.
pub const DEFAULT_PROFILER_ADDR: &str = "0.0.0.0:8585";

/// Profiling backend options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilingBackend {
    /// Record scopes in-process only (useful for tests and custom viewers).
    InProcess,
    /// Send profiling data to puffin_viewer via HTTP.
    PuffinHttp,
}

static PROFILING_SERVER: OnceLock<puffin_http::Server> = OnceLock::new();

/// Enable scope recording with the given backend.
///
/// # Example
/// ```no_run
/// use depot_core::profiling::{init_profiling, ProfilingBackend};
///
/// init_profiling(ProfilingBackend::PuffinHttp);
/// ```
pub fn init_profiling(backend: ProfilingBackend) {
    puffin::set_scopes_on(true);

    if backend == ProfilingBackend::PuffinHttp {
        match puffin_http::Server::new(DEFAULT_PROFILER_ADDR) {
            Ok(server) => {
                tracing::info!("Puffin profiler server started on http://{}", DEFAULT_PROFILER_ADDR);
                let _ = PROFILING_SERVER.set(server);
            }
            Err(e) => {
                tracing::error!("Failed to start puffin server: {}", e);
            }
        }
    }
}

/// Whether scopes are currently being recorded.
#[inline]
pub fn is_enabled() -> bool {
    puffin::are_scopes_on()
}

/// Mark the start of a new frame for profiling.
///
/// Hosts that drive the asset scheduler once per frame call this right
/// before ticking it.
#[inline]
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
