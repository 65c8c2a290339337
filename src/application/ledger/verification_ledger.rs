use chrono::{Local, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::draw::{Category, DrawRecord};
use crate::domain::errors::LedgerError;
use crate::domain::ports::AuditLog;
use crate::domain::prediction::{
    AccuracySummary, PendingPrediction, PredictionBatch, VerificationRecord,
};
use crate::domain::repositories::PredictionRepository;

/// Holds at most one pending prediction and resolves it against ground truth.
///
/// Persistence goes through `PredictionRepository`; every successful resolution
/// is also written to the human-readable audit log.
pub struct VerificationLedger {
    repository: Arc<dyn PredictionRepository>,
    audit_log: Arc<dyn AuditLog>,
    slot_count: usize,
}

impl VerificationLedger {
    pub fn new(
        repository: Arc<dyn PredictionRepository>,
        audit_log: Arc<dyn AuditLog>,
        slot_count: usize,
    ) -> Self {
        Self {
            repository,
            audit_log,
            slot_count,
        }
    }

    /// Persist `batch` as the pending prediction for `target_cycle_id`.
    ///
    /// Replaces any existing pending entry. An unresolved entry for another
    /// cycle is abandoned with a warning.
    pub async fn record_prediction(
        &self,
        target_cycle_id: &str,
        batch: &PredictionBatch,
    ) -> Result<PendingPrediction, LedgerError> {
        let lengths = [
            batch.categories.len(),
            batch.display_numbers.len(),
            batch.probabilities.len(),
        ];
        if let Some(&actual) = lengths.iter().find(|&&len| len != self.slot_count) {
            return Err(LedgerError::SlotMismatch {
                cycle_id: target_cycle_id.to_string(),
                expected: self.slot_count,
                actual,
            });
        }

        if let Some(previous) = self.pending().await?
            && previous.cycle_id != target_cycle_id
        {
            warn!(
                "Abandoning unresolved prediction for cycle {} (issued {}), replacing with cycle {}",
                previous.cycle_id, previous.created_at, target_cycle_id
            );
        }

        let pending = PendingPrediction::from_batch(target_cycle_id, batch);
        self.repository
            .save_pending(&pending)
            .await
            .map_err(LedgerError::Persistence)?;

        info!(
            "Pending prediction {} recorded for cycle {}",
            pending.prediction_id, pending.cycle_id
        );
        Ok(pending)
    }

    pub async fn pending(&self) -> Result<Option<PendingPrediction>, LedgerError> {
        self.repository
            .load_pending()
            .await
            .map_err(LedgerError::Persistence)
    }

    /// Verify the pending prediction against `candidates`.
    ///
    /// Returns the appended records: empty when nothing is pending, when the
    /// target draw is not among the candidates yet, or when another caller
    /// resolved the same entry first.
    pub async fn resolve(
        &self,
        candidates: &[DrawRecord],
    ) -> Result<Vec<VerificationRecord>, LedgerError> {
        let Some(pending) = self.pending().await? else {
            return Ok(Vec::new());
        };

        let Some(draw) = candidates
            .iter()
            .find(|d| d.draw_id.trim() == pending.cycle_id.trim())
        else {
            return Ok(Vec::new());
        };

        let records = build_verifications(&pending, draw)?;

        let appended = self
            .repository
            .resolve_pending(pending.prediction_id, &records)
            .await
            .map_err(LedgerError::Persistence)?;
        if appended == 0 {
            return Ok(Vec::new());
        }

        for record in &records {
            if let Err(e) = self.audit_log.append_line(&format_audit_line(record)).await {
                error!(
                    "Failed to write audit line for cycle {} slot {}: {:#}",
                    record.cycle_id, record.slot, e
                );
            }
        }

        let hits = records.iter().filter(|r| r.correct).count();
        info!(
            "Cycle {} verified: {}/{} slots correct",
            pending.cycle_id,
            hits,
            records.len()
        );

        Ok(records)
    }

    pub async fn accuracy_summary(&self) -> Result<AccuracySummary, LedgerError> {
        let slots = self
            .repository
            .accuracy_by_slot()
            .await
            .map_err(LedgerError::Persistence)?;
        Ok(AccuracySummary { slots })
    }

    pub async fn recent_verifications(
        &self,
        limit: usize,
    ) -> Result<Vec<VerificationRecord>, LedgerError> {
        self.repository
            .recent_verifications(limit)
            .await
            .map_err(LedgerError::Persistence)
    }
}

/// One record per slot of `pending`, compared against the real digits of `draw`
fn build_verifications(
    pending: &PendingPrediction,
    draw: &DrawRecord,
) -> Result<Vec<VerificationRecord>, LedgerError> {
    let verified_at = Utc::now();

    (0..pending.slot_count())
        .map(|slot| {
            let actual_digit = draw.digit(slot).ok_or_else(|| LedgerError::MalformedDraw {
                draw_id: draw.draw_id.clone(),
                slot,
            })?;
            let actual = Category::from_digit(actual_digit);
            let predicted = pending.predicted_categories[slot];

            Ok(VerificationRecord {
                prediction_id: pending.prediction_id,
                cycle_id: pending.cycle_id.clone(),
                slot,
                predicted,
                predicted_digit: pending.display_numbers.get(slot).copied().unwrap_or_default(),
                probability: pending.probabilities.get(slot).copied().unwrap_or_default(),
                actual,
                actual_digit,
                correct: predicted == actual,
                predicted_at: pending.created_at,
                verified_at,
            })
        })
        .collect()
}

/// `[HH:MM:SS DD/MM/YYYY] - <cycle> - predicted: 7 (High) | actual: 2 (Low) | [MISS] | slot: 0`
pub fn format_audit_line(record: &VerificationRecord) -> String {
    format!(
        "[{}] - {} - predicted: {} ({}) | actual: {} ({}) | [{}] | slot: {}",
        record
            .verified_at
            .with_timezone(&Local)
            .format("%H:%M:%S %d/%m/%Y"),
        record.cycle_id,
        record.predicted_digit,
        record.predicted,
        record.actual_digit,
        record.actual,
        if record.correct { "HIT" } else { "MISS" },
        record.slot
    )
}
