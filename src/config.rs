use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::order::DEFAULT_MAX_JUMP;

// ============================================================================
// Engine Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Forward steps an admin direct-set may skip
    pub max_jump: usize,
    /// Only paid orders enter the baking queue and get promoted
    pub queue_requires_payment: bool,
    pub rate_limit_max_actions: u32,
    pub rate_limit_window_secs: u64,
    pub metrics_port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_jump: DEFAULT_MAX_JUMP,
            queue_requires_payment: true,
            rate_limit_max_actions: 30,
            rate_limit_window_secs: 60,
            metrics_port: 9090,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid engine config")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
