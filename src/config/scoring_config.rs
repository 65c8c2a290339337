//! Scoring pipeline configuration parsing from environment variables.

use super::env::{optional_string, parse_f64, parse_usize};
use crate::domain::config::ScoringConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Scoring environment configuration
#[derive(Debug, Clone)]
pub struct ScoringEnvConfig {
    pub slot_count: usize,
    pub history_window: usize,
    pub recent_trend_window: usize,
    pub position_bias_step: f64,
    pub trend_bias_step: f64,
    pub probability_floor: f64,
    pub probability_ceiling: f64,
    /// Draws loaded from the store per prediction job
    pub history_fetch_limit: usize,
    /// Serialized random forest models; empty means a single neutral scorer
    pub scorer_model_paths: Vec<PathBuf>,
}

impl ScoringEnvConfig {
    pub fn from_env() -> Result<Self> {
        let scorer_model_paths = optional_string("SCORER_MODEL_PATHS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            slot_count: parse_usize("SLOT_COUNT", 5)?,
            history_window: parse_usize("HISTORY_WINDOW", 10)?,
            recent_trend_window: parse_usize("RECENT_TREND_WINDOW", 5)?,
            position_bias_step: parse_f64("POSITION_BIAS_STEP", 0.05)?,
            trend_bias_step: parse_f64("TREND_BIAS_STEP", 0.2)?,
            probability_floor: parse_f64("PROBABILITY_FLOOR", 0.1)?,
            probability_ceiling: parse_f64("PROBABILITY_CEILING", 0.9)?,
            history_fetch_limit: parse_usize("HISTORY_FETCH_LIMIT", 50)?,
            scorer_model_paths,
        })
    }

    /// Validated pipeline configuration
    pub fn to_scoring_config(&self) -> Result<ScoringConfig> {
        let config = ScoringConfig::new(
            self.slot_count,
            self.history_window,
            self.recent_trend_window,
            self.position_bias_step,
            self.trend_bias_step,
            self.probability_floor,
            self.probability_ceiling,
        )
        .context("Invalid scoring configuration")?;

        if self.history_fetch_limit < config.required_history() {
            anyhow::bail!(
                "HISTORY_FETCH_LIMIT ({}) must be at least {} to cover the history and trend windows",
                self.history_fetch_limit,
                config.required_history()
            );
        }

        Ok(config)
    }
}
