//! Structured logging with `tracing`.
//!
//! Every crate in the workspace logs through `tracing` macros with structured
//! fields (`event_type`, `phase`, `trigger`, `trigger_id`, `cycle_id`). This
//! module installs the process-wide subscriber and provides the in-memory
//! capture layer that tests use to assert on emitted records.

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

/// Initialize the global tracing subscriber with stderr output.
///
/// Call once at application startup. Subsequent calls are no-ops.
/// `RUST_LOG` takes precedence over `level` when set.
///
/// # Arguments
///
/// * `level` - Minimum log level to display (e.g. `"info"`).
/// * `json` - Emit one JSON object per line instead of the compact format.
pub fn init_subscriber(level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init fails if a global subscriber is already installed
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}
