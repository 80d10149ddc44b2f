//! Tracing subscriber setup
//!
//! Small helper for embedders and examples; library code only emits
//! `tracing` events and never installs a subscriber on its own.

use crate::config::LoggingConfig;
use anyhow::Result;

/// Install a global fmt subscriber honoring `RUST_LOG` when set
///
/// Falls back to the configured level for this crate and `warn` for
/// everything else. Safe to call more than once; later calls fail if a
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("delegated_ink={},warn", config.level))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}
