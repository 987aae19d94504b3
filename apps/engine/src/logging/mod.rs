//! Structured engine logging helpers.

pub mod draft_log;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize structured logging for an embedding process.
///
/// Level comes from `RUST_LOG`, defaulting to `info`. Safe to call more than
/// once; later calls are no-ops.
pub fn init_tracing() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).try_init().ok();
}
