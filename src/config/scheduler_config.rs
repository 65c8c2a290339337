//! Countdown scheduler configuration parsing from environment variables.

use super::env::{parse_u32, parse_u64};
use crate::domain::config::CycleConfig;
use anyhow::{Context, Result};
use std::time::Duration;

/// Scheduler environment configuration
#[derive(Debug, Clone)]
pub struct SchedulerEnvConfig {
    pub poll_interval_ms: u64,
    pub fire_window_start_secs: u32,
    pub fire_window_end_secs: u32,
    pub rollover_threshold_secs: u32,
    pub rollover_floor_secs: u32,
    pub max_countdown_secs: u32,
    pub error_threshold: u32,
    pub error_decay_secs: u64,
    pub countdown_timeout_ms: u64,
    pub shutdown_grace_ms: u64,
}

impl SchedulerEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            poll_interval_ms: parse_u64("POLL_INTERVAL_MS", 1000)?,
            fire_window_start_secs: parse_u32("FIRE_WINDOW_START_SECS", 15)?,
            fire_window_end_secs: parse_u32("FIRE_WINDOW_END_SECS", 28)?,
            rollover_threshold_secs: parse_u32("ROLLOVER_THRESHOLD_SECS", 30)?,
            rollover_floor_secs: parse_u32("ROLLOVER_FLOOR_SECS", 1)?,
            max_countdown_secs: parse_u32("MAX_COUNTDOWN_SECS", 180)?,
            error_threshold: parse_u32("ERROR_THRESHOLD", 5)?,
            error_decay_secs: parse_u64("ERROR_DECAY_SECS", 60)?,
            countdown_timeout_ms: parse_u64("COUNTDOWN_TIMEOUT_MS", 800)?,
            shutdown_grace_ms: parse_u64("SHUTDOWN_GRACE_MS", 5000)?,
        })
    }

    /// Validated state machine configuration
    pub fn to_cycle_config(&self) -> Result<CycleConfig> {
        CycleConfig::new(
            Duration::from_millis(self.poll_interval_ms),
            self.fire_window_start_secs..=self.fire_window_end_secs,
            self.rollover_floor_secs,
            self.rollover_threshold_secs,
            self.max_countdown_secs,
            self.error_threshold,
            Duration::from_secs(self.error_decay_secs),
            Duration::from_millis(self.countdown_timeout_ms),
            Duration::from_millis(self.shutdown_grace_ms),
        )
        .context("Invalid scheduler configuration")
    }
}
