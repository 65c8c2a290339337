//! Scoring Configuration Domain Value Object

use thiserror::Error;

/// Error type for ScoringConfig validation
#[derive(Debug, Error, PartialEq)]
pub enum ScoringConfigError {
    #[error("Invalid limit: {field} = {value}. Must be positive")]
    InvalidLimit { field: String, value: usize },

    #[error("Invalid clamp band [{floor}, {ceiling}]: must satisfy 0.0 <= floor < 0.5 < ceiling <= 1.0")]
    InvalidClampBand { floor: f64, ceiling: f64 },

    #[error("Invalid step: {field} = {value}. Must be finite and non-negative")]
    InvalidStep { field: String, value: f64 },
}

/// Parameters of the per-slot scoring pipeline
///
/// # Invariants
///
/// - `slot_count`, `history_window` and `trend_window` are positive
/// - the clamp band straddles the 0.5 decision threshold inside [0, 1]
/// - bias steps are finite and non-negative
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Number of digit slots per draw (K)
    pub slot_count: usize,
    /// Outcomes used for feature extraction (W)
    pub history_window: usize,
    /// Draws used for the short-horizon trend bias
    pub trend_window: usize,
    pub position_bias_step: f64,
    pub trend_bias_step: f64,
    pub probability_floor: f64,
    pub probability_ceiling: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            slot_count: 5,
            history_window: 10,
            trend_window: 5,
            position_bias_step: 0.05,
            trend_bias_step: 0.2,
            probability_floor: 0.1,
            probability_ceiling: 0.9,
        }
    }
}

impl ScoringConfig {
    pub fn new(
        slot_count: usize,
        history_window: usize,
        trend_window: usize,
        position_bias_step: f64,
        trend_bias_step: f64,
        probability_floor: f64,
        probability_ceiling: f64,
    ) -> Result<Self, ScoringConfigError> {
        let config = Self {
            slot_count,
            history_window,
            trend_window,
            position_bias_step,
            trend_bias_step,
            probability_floor,
            probability_ceiling,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ScoringConfigError> {
        for (field, value) in [
            ("slot_count", self.slot_count),
            ("history_window", self.history_window),
            ("trend_window", self.trend_window),
        ] {
            if value == 0 {
                return Err(ScoringConfigError::InvalidLimit {
                    field: field.to_string(),
                    value,
                });
            }
        }

        let (floor, ceiling) = (self.probability_floor, self.probability_ceiling);
        if !(0.0..0.5).contains(&floor) || !(ceiling > 0.5 && ceiling <= 1.0) {
            return Err(ScoringConfigError::InvalidClampBand { floor, ceiling });
        }

        for (field, value) in [
            ("position_bias_step", self.position_bias_step),
            ("trend_bias_step", self.trend_bias_step),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ScoringConfigError::InvalidStep {
                    field: field.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }

    /// Minimum number of newest-first draws a pipeline call needs
    pub fn required_history(&self) -> usize {
        self.history_window.max(self.trend_window)
    }

    /// Middle slot index; zero positional bias is applied here
    pub fn center_slot(&self) -> f64 {
        (self.slot_count as f64 - 1.0) / 2.0
    }

    /// Weight `(slot + 1) / K` giving later slots more momentum influence
    pub fn positional_weight(&self, slot: usize) -> f64 {
        (slot as f64 + 1.0) / self.slot_count as f64
    }

    pub fn clamp(&self, probability: f64) -> f64 {
        probability.clamp(self.probability_floor, self.probability_ceiling)
    }
}
