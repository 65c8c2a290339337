//! Prediction and verification value types shared by the pipeline and the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::draw::Category;

/// Output of one scoring pipeline call: parallel sequences, one entry per slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionBatch {
    pub categories: Vec<Category>,
    /// Illustrative digits consistent with `categories`. Display only.
    pub display_numbers: Vec<u8>,
    pub probabilities: Vec<f64>,
    /// Fraction of high outcomes per slot over the recent-trend window
    pub trends: Vec<f64>,
}

impl PredictionBatch {
    pub fn slot_count(&self) -> usize {
        self.categories.len()
    }
}

/// The single in-flight forecast awaiting verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPrediction {
    pub prediction_id: Uuid,
    /// Draw id the forecast targets
    pub cycle_id: String,
    pub created_at: DateTime<Utc>,
    pub predicted_categories: Vec<Category>,
    pub display_numbers: Vec<u8>,
    pub probabilities: Vec<f64>,
}

impl PendingPrediction {
    pub fn from_batch(cycle_id: impl Into<String>, batch: &PredictionBatch) -> Self {
        Self {
            prediction_id: Uuid::new_v4(),
            cycle_id: cycle_id.into(),
            created_at: Utc::now(),
            predicted_categories: batch.categories.clone(),
            display_numbers: batch.display_numbers.clone(),
            probabilities: batch.probabilities.clone(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.predicted_categories.len()
    }
}

/// Immutable result of checking one slot of a prediction against the real draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub prediction_id: Uuid,
    pub cycle_id: String,
    pub slot: usize,
    pub predicted: Category,
    pub predicted_digit: u8,
    pub probability: f64,
    pub actual: Category,
    pub actual_digit: u8,
    pub correct: bool,
    /// When the prediction was issued
    pub predicted_at: DateTime<Utc>,
    pub verified_at: DateTime<Utc>,
}

/// Hit counts for one slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlotAccuracy {
    pub slot: usize,
    pub hits: u64,
    pub total: u64,
}

impl SlotAccuracy {
    pub fn hit_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.hits as f64 / self.total as f64)
        }
    }
}

/// Aggregate verification accuracy across all resolved predictions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccuracySummary {
    pub slots: Vec<SlotAccuracy>,
}

impl AccuracySummary {
    pub fn hits(&self) -> u64 {
        self.slots.iter().map(|s| s.hits).sum()
    }

    pub fn total(&self) -> u64 {
        self.slots.iter().map(|s| s.total).sum()
    }

    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(self.hits() as f64 / total as f64)
        }
    }
}
