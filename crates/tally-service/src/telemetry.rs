//! # Telemetry
//!
//! Structured logging via `tracing`.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - everything at debug
//! - `RUST_LOG=tally_db=trace` - one crate only
//! - Default: `info,tally=debug,sqlx=warn`

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,tally=debug,sqlx=warn";

/// Builds the filter: `RUST_LOG` when set and valid, else [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init();
}
