//! Observability configuration parsing from environment variables.

use super::env::{parse_bool, parse_u64};
use anyhow::Result;

/// Observability environment configuration
#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    pub enabled: bool,
    /// Seconds between JSON metric snapshots
    pub interval_secs: u64,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            enabled: parse_bool("OBSERVABILITY_ENABLED", true),
            interval_secs: parse_u64("OBSERVABILITY_INTERVAL", 60)?.max(1),
        })
    }
}
