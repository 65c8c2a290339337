//! Cycle Configuration Domain Value Object
//!
//! Timing parameters of the countdown state machine, validated on construction.

use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;

/// Error type for CycleConfig validation
#[derive(Debug, Error, PartialEq)]
pub enum CycleConfigError {
    #[error("Invalid firing window [{start}, {end}]: must be ordered and within {min}..={max}")]
    InvalidWindow {
        start: u32,
        end: u32,
        min: u32,
        max: u32,
    },

    #[error("Invalid rollover: floor {floor} must be below threshold {threshold} and threshold within 0..={max}")]
    InvalidRollover { floor: u32, threshold: u32, max: u32 },

    #[error("Invalid limit: {field} = {value}. Must be positive")]
    InvalidLimit { field: String, value: u64 },
}

/// Countdown state machine configuration
///
/// # Invariants
///
/// - `fire_window` is ordered and lies inside `early_reset_secs + 1..=max_countdown_secs`,
///   so the early reset can never re-arm a firing inside the same cycle
/// - `rollover_floor_secs < rollover_threshold_secs <= max_countdown_secs`
/// - `error_threshold`, poll period and timeouts are positive
#[derive(Debug, Clone, PartialEq)]
pub struct CycleConfig {
    pub poll_interval: Duration,
    /// Countdown values (inclusive) during which a prediction may fire
    pub fire_window: RangeInclusive<u32>,
    /// Previous reading at or below this counts as "at zero" for rollover detection
    pub rollover_floor_secs: u32,
    /// Current reading above this, right after a zero, marks a new cycle
    pub rollover_threshold_secs: u32,
    /// Readings above this are rejected as invalid
    pub max_countdown_secs: u32,
    /// Reading at or below this clears the fired flag early
    pub early_reset_secs: u32,
    pub error_threshold: u32,
    pub error_decay: Duration,
    pub read_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            fire_window: 15..=28,
            rollover_floor_secs: 1,
            rollover_threshold_secs: 30,
            max_countdown_secs: 180,
            early_reset_secs: 1,
            error_threshold: 5,
            error_decay: Duration::from_secs(60),
            read_timeout: Duration::from_millis(800),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl CycleConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        poll_interval: Duration,
        fire_window: RangeInclusive<u32>,
        rollover_floor_secs: u32,
        rollover_threshold_secs: u32,
        max_countdown_secs: u32,
        error_threshold: u32,
        error_decay: Duration,
        read_timeout: Duration,
        shutdown_grace: Duration,
    ) -> Result<Self, CycleConfigError> {
        let config = Self {
            poll_interval,
            fire_window,
            rollover_floor_secs,
            rollover_threshold_secs,
            max_countdown_secs,
            early_reset_secs: rollover_floor_secs,
            error_threshold,
            error_decay,
            read_timeout,
            shutdown_grace,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CycleConfigError> {
        let (start, end) = (*self.fire_window.start(), *self.fire_window.end());
        let min = self.early_reset_secs.max(self.rollover_floor_secs) + 1;
        if start > end || start < min || end > self.max_countdown_secs {
            return Err(CycleConfigError::InvalidWindow {
                start,
                end,
                min,
                max: self.max_countdown_secs,
            });
        }

        if self.rollover_floor_secs >= self.rollover_threshold_secs
            || self.rollover_threshold_secs > self.max_countdown_secs
        {
            return Err(CycleConfigError::InvalidRollover {
                floor: self.rollover_floor_secs,
                threshold: self.rollover_threshold_secs,
                max: self.max_countdown_secs,
            });
        }

        if self.error_threshold == 0 {
            return Err(CycleConfigError::InvalidLimit {
                field: "error_threshold".to_string(),
                value: 0,
            });
        }

        for (field, value) in [
            ("poll_interval", self.poll_interval),
            ("error_decay", self.error_decay),
            ("read_timeout", self.read_timeout),
        ] {
            if value.is_zero() {
                return Err(CycleConfigError::InvalidLimit {
                    field: field.to_string(),
                    value: 0,
                });
            }
        }

        Ok(())
    }

    pub fn in_fire_window(&self, seconds: u32) -> bool {
        self.fire_window.contains(&seconds)
    }
}
