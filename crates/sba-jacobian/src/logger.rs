//! Logging setup for `check_jacobian` and the benchmarks
//!
//! The library itself only emits `debug!` events from `configure`, describing the
//! parameter layout it planned. Binaries install a subscriber with [`init_logger`] and
//! raise the level through `RUST_LOG` to see them:
//!
//! ```bash
//! RUST_LOG=sba_jacobian=debug cargo run --bin check_jacobian -- --views 8
//! ```

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Installs a subscriber at INFO, overridable through `RUST_LOG`.
///
/// # Example
/// ```no_run
/// use sba_jacobian::init_logger;
///
/// init_logger();
/// tracing::info!("Jacobian check started");
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Installs a subscriber with `default_level` for every target not named in `RUST_LOG`.
///
/// Events carry a timestamp, level and target; file and line are left out since the
/// only events are the per-configure layout summaries and the tool's own reports.
/// A second call is a no-op so benchmarks and tests may call it freely.
pub fn init_logger_with_level(default_level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    // Err only when a global subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
