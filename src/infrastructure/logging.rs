//! Logging setup
//!
//! `RUST_LOG` wins when set; otherwise the given level applies to this
//! crate only, so the container tooling's dependency chatter stays out of
//! build logs.

use tracing_subscriber::{EnvFilter, fmt};

/// Initializes the global tracing subscriber at the given level.
///
/// Later calls in the same process are no-ops.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fnforge={level}")));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init();
}
