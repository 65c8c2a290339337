//! Countdown source, draw feed and ingestion configuration.

use super::Mode;
use super::env::{optional_string, parse_u32, parse_u64};
use anyhow::{Context, Result};
use url::Url;

/// Source environment configuration
#[derive(Debug, Clone)]
pub struct SourceEnvConfig {
    pub countdown_url: Option<String>,
    pub refresh_url: Option<String>,
    pub draws_url: Option<String>,
    pub ingest_interval_secs: u64,
    pub ingest_timeout_ms: u64,
    /// Draws older than this are purged daily; 0 disables retention
    pub retention_days: u32,
    /// Cycle length of the simulated source in mock mode
    pub simulated_cycle_secs: u64,
}

impl SourceEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            countdown_url: optional_string("COUNTDOWN_URL"),
            refresh_url: optional_string("REFRESH_URL"),
            draws_url: optional_string("DRAWS_URL"),
            ingest_interval_secs: parse_u64("INGEST_INTERVAL_SECS", 5)?,
            ingest_timeout_ms: parse_u64("INGEST_TIMEOUT_MS", 10_000)?,
            retention_days: parse_u32("RETENTION_DAYS", 0)?,
            simulated_cycle_secs: parse_u64("SIMULATED_CYCLE_SECS", 60)?,
        })
    }

    /// Endpoints must be present and well-formed in HTTP mode
    pub fn validate(&self, mode: &Mode) -> Result<()> {
        if self.ingest_interval_secs == 0 || self.ingest_timeout_ms == 0 {
            anyhow::bail!("INGEST_INTERVAL_SECS and INGEST_TIMEOUT_MS must be positive");
        }

        if let Some(url) = &self.refresh_url {
            validate_url("REFRESH_URL", url)?;
        }

        match mode {
            Mode::Mock => {
                if self.simulated_cycle_secs < 2 {
                    anyhow::bail!("SIMULATED_CYCLE_SECS must be at least 2");
                }
                Ok(())
            }
            Mode::Http => {
                let countdown = self
                    .countdown_url
                    .as_deref()
                    .context("COUNTDOWN_URL is required when MODE=http")?;
                validate_url("COUNTDOWN_URL", countdown)?;

                let draws = self
                    .draws_url
                    .as_deref()
                    .context("DRAWS_URL is required when MODE=http")?;
                validate_url("DRAWS_URL", draws)?;
                Ok(())
            }
        }
    }
}

fn validate_url(key: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw).with_context(|| format!("{} is not a valid URL: {}", key, raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("{} must use http or https, got {}", key, url.scheme());
    }
    Ok(())
}
