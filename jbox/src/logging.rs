//! Diagnostics go to stderr; stdout carries only the tool's result.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `JBOX_LOG=jbox_kernel=debug`.
pub const LOG_ENV: &str = "JBOX_LOG";

pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
