//! Registry center configuration

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

pub const ENV_OUTBOUND_CAPACITY: &str = "REGISTRY_OUTBOUND_CAPACITY";
pub const ENV_NOTIFY_ON_CHANGE: &str = "REGISTRY_NOTIFY_ON_CHANGE";

/// Registry center configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterConfig {
    /// Envelopes buffered per subscriber before pushes to it are dropped
    pub outbound_capacity: usize,
    /// Push the updated list to subscribers after every register/unregister
    pub notify_on_change: bool,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            notify_on_change: true,
        }
    }
}

impl CenterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.outbound_capacity == 0 {
            bail!("outbound_capacity must be at least 1");
        }
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse registry config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry config from {}", path.display()))?;
        let config = Self::from_yaml_str(&yaml)?;
        info!("Registry config loaded from {}", path.display());
        Ok(config)
    }

    /// Build from `REGISTRY_*` environment variables, defaulting what is unset
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparsable values are ignored with a warning
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_OUTBOUND_CAPACITY) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => config.outbound_capacity = capacity,
                _ => warn!(
                    "Ignoring invalid {}={:?}, using {}",
                    ENV_OUTBOUND_CAPACITY, raw, config.outbound_capacity
                ),
            }
        }

        if let Some(raw) = lookup(ENV_NOTIFY_ON_CHANGE) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.notify_on_change = true,
                "0" | "false" | "no" | "off" => config.notify_on_change = false,
                _ => warn!(
                    "Ignoring invalid {}={:?}, using {}",
                    ENV_NOTIFY_ON_CHANGE, raw, config.notify_on_change
                ),
            }
        }

        config
    }
}
