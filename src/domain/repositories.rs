//! Repository Pattern Abstractions
//!
//! Persistence traits for the two stores the scheduler relies on:
//! - `DrawRepository`: the historical draw store (written only by ingestion)
//! - `PredictionRepository`: the pending prediction and the verification ledger
//!
//! # Current Implementation
//!
//! SQLite-backed implementations live in `infrastructure::persistence`.

use crate::domain::draw::DrawRecord;
use crate::domain::prediction::{PendingPrediction, SlotAccuracy, VerificationRecord};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository for historical draws
#[async_trait]
pub trait DrawRepository: Send + Sync {
    /// Store a draw. Returns `false` when a draw with the same id already exists.
    async fn append(&self, draw: &DrawRecord) -> Result<bool>;

    /// Most recent draws, newest first
    async fn find_recent(&self, limit: usize) -> Result<Vec<DrawRecord>>;

    async fn find_by_id(&self, draw_id: &str) -> Result<Option<DrawRecord>>;

    async fn count(&self) -> Result<usize>;

    /// Delete draws older than `cutoff`. Returns the number removed.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Repository for the pending prediction and its verifications
#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// Replace the pending prediction atomically
    async fn save_pending(&self, pending: &PendingPrediction) -> Result<()>;

    async fn load_pending(&self) -> Result<Option<PendingPrediction>>;

    /// Append `records` and clear the pending prediction `prediction_id` in one
    /// transaction. Returns the number of rows appended; 0 when the pending entry
    /// was already resolved or replaced.
    async fn resolve_pending(
        &self,
        prediction_id: uuid::Uuid,
        records: &[VerificationRecord],
    ) -> Result<usize>;

    /// Most recent verification rows, newest first
    async fn recent_verifications(&self, limit: usize) -> Result<Vec<VerificationRecord>>;

    /// Hit counts grouped by slot, ordered by slot
    async fn accuracy_by_slot(&self) -> Result<Vec<SlotAccuracy>>;
}
