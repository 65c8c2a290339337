use crate::domain::draw::Category;
use crate::domain::prediction::{PendingPrediction, SlotAccuracy, VerificationRecord};
use crate::domain::repositories::PredictionRepository;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Singleton key of the pending prediction row
const PENDING_ROW_ID: i64 = 1;

pub struct SqlitePredictionRepository {
    pool: SqlitePool,
}

impl SqlitePredictionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

type PendingRow = (String, String, DateTime<Utc>, String, String, String);

type VerificationRow = (
    String,
    String,
    i64,
    String,
    i64,
    f64,
    String,
    i64,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn parse_category(raw: &str) -> Result<Category> {
    Category::parse(raw).ok_or_else(|| anyhow!("Unknown category in ledger: {}", raw))
}

fn pending_from_row(row: PendingRow) -> Result<PendingPrediction> {
    let (prediction_id, cycle_id, created_at, categories, numbers, probabilities) = row;
    Ok(PendingPrediction {
        prediction_id: Uuid::parse_str(&prediction_id).context("Corrupt prediction id")?,
        cycle_id,
        created_at,
        predicted_categories: serde_json::from_str(&categories)
            .context("Corrupt predicted categories")?,
        display_numbers: serde_json::from_str(&numbers).context("Corrupt display numbers")?,
        probabilities: serde_json::from_str(&probabilities).context("Corrupt probabilities")?,
    })
}

fn verification_from_row(row: VerificationRow) -> Result<VerificationRecord> {
    let (
        prediction_id,
        cycle_id,
        slot,
        predicted,
        predicted_digit,
        probability,
        actual,
        actual_digit,
        correct,
        predicted_at,
        verified_at,
    ) = row;

    Ok(VerificationRecord {
        prediction_id: Uuid::parse_str(&prediction_id).context("Corrupt prediction id")?,
        cycle_id,
        slot: slot as usize,
        predicted: parse_category(&predicted)?,
        predicted_digit: predicted_digit as u8,
        probability,
        actual: parse_category(&actual)?,
        actual_digit: actual_digit as u8,
        correct,
        predicted_at,
        verified_at,
    })
}

#[async_trait]
impl PredictionRepository for SqlitePredictionRepository {
    /// Single-statement upsert: the previous pending row is replaced or kept, never half-written
    async fn save_pending(&self, pending: &PendingPrediction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pending_prediction (
                id,
                prediction_id,
                cycle_id,
                created_at,
                predicted_categories,
                display_numbers,
                probabilities
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(id) DO UPDATE SET
                prediction_id = excluded.prediction_id,
                cycle_id = excluded.cycle_id,
                created_at = excluded.created_at,
                predicted_categories = excluded.predicted_categories,
                display_numbers = excluded.display_numbers,
                probabilities = excluded.probabilities
            "#,
        )
        .bind(PENDING_ROW_ID)
        .bind(pending.prediction_id.to_string())
        .bind(&pending.cycle_id)
        .bind(pending.created_at)
        .bind(serde_json::to_string(&pending.predicted_categories)?)
        .bind(serde_json::to_string(&pending.display_numbers)?)
        .bind(serde_json::to_string(&pending.probabilities)?)
        .execute(&self.pool)
        .await
        .context("Failed to save pending prediction")?;

        Ok(())
    }

    async fn load_pending(&self) -> Result<Option<PendingPrediction>> {
        let row = sqlx::query_as::<_, PendingRow>(
            r#"
            SELECT
                prediction_id,
                cycle_id,
                created_at,
                predicted_categories,
                display_numbers,
                probabilities
            FROM pending_prediction
            WHERE id = $1
            "#,
        )
        .bind(PENDING_ROW_ID)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load pending prediction")?;

        row.map(pending_from_row).transpose()
    }

    async fn resolve_pending(
        &self,
        prediction_id: Uuid,
        records: &[VerificationRecord],
    ) -> Result<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to open ledger transaction")?;

        let cleared = sqlx::query("DELETE FROM pending_prediction WHERE id = $1 AND prediction_id = $2")
            .bind(PENDING_ROW_ID)
            .bind(prediction_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to clear pending prediction")?;

        if cleared.rows_affected() == 0 {
            // Resolved or replaced by someone else meanwhile
            tx.rollback().await?;
            return Ok(0);
        }

        // A duplicate (cycle_id, slot) fails the insert and the dropped
        // transaction rolls back, keeping the pending row
        let mut appended = 0;
        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO verifications (
                    prediction_id,
                    cycle_id,
                    slot,
                    predicted,
                    predicted_digit,
                    probability,
                    actual,
                    actual_digit,
                    correct,
                    predicted_at,
                    verified_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(record.prediction_id.to_string())
            .bind(&record.cycle_id)
            .bind(record.slot as i64)
            .bind(record.predicted.as_str())
            .bind(record.predicted_digit as i64)
            .bind(record.probability)
            .bind(record.actual.as_str())
            .bind(record.actual_digit as i64)
            .bind(record.correct)
            .bind(record.predicted_at)
            .bind(record.verified_at)
            .execute(&mut *tx)
            .await
            .context("Failed to append verification")?;

            appended += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .context("Failed to commit ledger transaction")?;

        Ok(appended)
    }

    async fn recent_verifications(&self, limit: usize) -> Result<Vec<VerificationRecord>> {
        let rows = sqlx::query_as::<_, VerificationRow>(
            r#"
            SELECT
                prediction_id,
                cycle_id,
                slot,
                predicted,
                predicted_digit,
                probability,
                actual,
                actual_digit,
                correct,
                predicted_at,
                verified_at
            FROM verifications
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch verifications")?;

        rows.into_iter().map(verification_from_row).collect()
    }

    async fn accuracy_by_slot(&self) -> Result<Vec<SlotAccuracy>> {
        let rows = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT slot, SUM(correct), COUNT(*)
            FROM verifications
            GROUP BY slot
            ORDER BY slot
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to aggregate verification accuracy")?;

        Ok(rows
            .into_iter()
            .map(|(slot, hits, total)| SlotAccuracy {
                slot: slot as usize,
                hits: hits as u64,
                total: total as u64,
            })
            .collect())
    }
}
