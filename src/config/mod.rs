//! Configuration module for Cyclecast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Scheduler, Scoring, Source, and Observability.

mod env;
mod observability_config;
mod scheduler_config;
mod scoring_config;
mod source_config;

pub use observability_config::ObservabilityEnvConfig;
pub use scheduler_config::SchedulerEnvConfig;
pub use scoring_config::ScoringEnvConfig;
pub use source_config::SourceEnvConfig;

use crate::domain::config::{CycleConfig, ScoringConfig};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/cyclecast.db";
pub const DEFAULT_AUDIT_LOG_PATH: &str = "data/prediction_history.txt";

/// Where the countdown and the draws come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Simulated wall-clock cycle, no network
    Mock,
    /// Remote HTTP endpoints
    Http,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "http" => Ok(Mode::Http),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'mock' or 'http'", s),
        }
    }
}

/// Main application configuration.
///
/// Aggregates the sub-configs and holds the validated domain value objects
/// derived from them.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub database_url: String,
    pub audit_log_path: PathBuf,

    pub scheduler: SchedulerEnvConfig,
    pub scoring: ScoringEnvConfig,
    pub source: SourceEnvConfig,
    pub observability: ObservabilityEnvConfig,

    pub cycle: CycleConfig,
    pub scoring_config: ScoringConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Loads every sub-config, then validates the combination.
    pub fn from_env() -> Result<Self> {
        let mode_str = std::env::var("MODE").unwrap_or_else(|_| "mock".to_string());
        let mode = Mode::from_str(&mode_str)?;

        let database_url =
            env::optional_string("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let audit_log_path = PathBuf::from(
            env::optional_string("AUDIT_LOG_PATH")
                .unwrap_or_else(|| DEFAULT_AUDIT_LOG_PATH.to_string()),
        );

        let scheduler = SchedulerEnvConfig::from_env().context("Failed to load scheduler config")?;
        let scoring = ScoringEnvConfig::from_env().context("Failed to load scoring config")?;
        let source = SourceEnvConfig::from_env().context("Failed to load source config")?;
        let observability =
            ObservabilityEnvConfig::from_env().context("Failed to load observability config")?;

        Self::assemble(
            mode,
            database_url,
            audit_log_path,
            scheduler,
            scoring,
            source,
            observability,
        )
    }

    /// Validates and combines already-parsed sections
    pub fn assemble(
        mode: Mode,
        database_url: String,
        audit_log_path: PathBuf,
        scheduler: SchedulerEnvConfig,
        scoring: ScoringEnvConfig,
        source: SourceEnvConfig,
        observability: ObservabilityEnvConfig,
    ) -> Result<Self> {
        let cycle = scheduler.to_cycle_config()?;
        let scoring_config = scoring.to_scoring_config()?;
        source.validate(&mode)?;

        Ok(Self {
            mode,
            database_url,
            audit_log_path,
            scheduler,
            scoring,
            source,
            observability,
            cycle,
            scoring_config,
        })
    }

    /// Re-validates after command-line overrides of the mode
    pub fn with_mode(mut self, mode: Mode) -> Result<Self> {
        self.source.validate(&mode)?;
        self.mode = mode;
        Ok(self)
    }
}
