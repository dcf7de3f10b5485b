//! Subscriber setup for binaries. Library code only emits `tracing` events.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber. `RUST_LOG` wins over `default_level`.
///
/// Fails if a global subscriber is already installed or the level does not
/// parse as a filter directive.
pub fn init_tracing(default_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| anyhow!("invalid log level {default_level:?}: {e}"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("install tracing subscriber: {e}"))
}
