//! Configuration
//!
//! Tuning knobs for embedders, loadable from TOML. Everything here has a
//! sensible default; the contract-level behaviors (slot replacement,
//! watermark semantics, error taxonomy) are deliberately not configurable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InkConfig {
    /// Presenter tuning
    #[serde(default)]
    pub presenter: PresenterConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl InkConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: InkConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field-level constraints
    pub fn validate(&self) -> Result<()> {
        if self.presenter.sample_capacity == 0 {
            anyhow::bail!("presenter.sample_capacity must be > 0");
        }
        if self.presenter.probe_timeout_ms == 0 {
            anyhow::bail!("presenter.probe_timeout_ms must be > 0");
        }
        Ok(())
    }
}

/// Presenter tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenterConfig {
    /// Raw sample channel capacity
    ///
    /// Bounds the backlog a presenter can hold between two compositing
    /// ticks; samples beyond it are dropped at the push side.
    #[serde(default = "default_sample_capacity")]
    pub sample_capacity: usize,

    /// How long a presenter request waits for the capability probe (ms)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_sample_capacity() -> usize {
    512
}
fn default_probe_timeout_ms() -> u64 {
    2000
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            sample_capacity: default_sample_capacity(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl PresenterConfig {
    /// Probe timeout as a [`Duration`]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter for this crate (trace/debug/info/warn/error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
