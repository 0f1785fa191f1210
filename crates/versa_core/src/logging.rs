//! Tracing subscriber setup.

use crate::RunMode;
use tracing_subscriber::EnvFilter;
use versa_error::ConfigError;

/// Default filter directive for a run.
///
/// Test runs and `--verbose` log at debug level; everything else at info.
pub fn default_directive(mode: RunMode, verbose: bool) -> &'static str {
    if verbose || mode.is_test() {
        "debug"
    } else {
        "info"
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over the mode default.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(mode: RunMode, verbose: bool) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(mode, verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(mode.is_test())
        .try_init()
        .map_err(|e| ConfigError::new(format!("Failed to initialize logging: {}", e)))
}
