use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::application::ledger::VerificationLedger;
use crate::application::scoring::ScoringPipeline;
use crate::domain::draw::{DrawRecord, next_draw_id, sort_newest_first};
use crate::domain::errors::{LedgerError, PipelineError, ScorerError};
use crate::domain::prediction::PredictionBatch;
use crate::domain::repositories::DrawRepository;
use crate::infrastructure::observability::Metrics;

/// Why a fired job produced no pending prediction
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Failed to load draw history: {0}")]
    History(#[source] anyhow::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Cannot derive the next cycle id from draw {0}")]
    UnknownNextCycle(String),
}

impl JobError {
    /// Outcome label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            JobError::History(_) => "store_error",
            JobError::Pipeline(PipelineError::InsufficientHistory { .. }) => "insufficient_history",
            JobError::Pipeline(PipelineError::MalformedRecord { .. }) => "malformed_history",
            JobError::Pipeline(PipelineError::EmptyEnsemble)
            | JobError::Pipeline(PipelineError::Scorer(_)) => "scorer_error",
            JobError::Ledger(_) => "ledger_error",
            JobError::UnknownNextCycle(_) => "unknown_cycle",
        }
    }
}

/// Result of a successful job
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub target_cycle_id: String,
    /// Verification rows appended for the previous prediction
    pub verified: usize,
}

/// Work launched once per cycle by the countdown scheduler
#[async_trait]
pub trait PredictionJob: Send + Sync {
    async fn run(&self) -> Result<JobReport, JobError>;
}

/// Resolve the previous prediction, then predict and record the next cycle.
pub struct PredictionService {
    draws: Arc<dyn DrawRepository>,
    pipeline: ScoringPipeline,
    ledger: Arc<VerificationLedger>,
    metrics: Metrics,
    history_fetch_limit: usize,
}

impl PredictionService {
    pub fn new(
        draws: Arc<dyn DrawRepository>,
        pipeline: ScoringPipeline,
        ledger: Arc<VerificationLedger>,
        metrics: Metrics,
        history_fetch_limit: usize,
    ) -> Self {
        Self {
            draws,
            pipeline,
            ledger,
            metrics,
            history_fetch_limit,
        }
    }

    async fn load_history(&self) -> Result<Vec<DrawRecord>, JobError> {
        let mut records = self
            .draws
            .find_recent(self.history_fetch_limit)
            .await
            .map_err(JobError::History)?;
        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Verification failures are logged and do not block the next prediction
    async fn verify_previous(&self, records: &[DrawRecord]) -> usize {
        match self.ledger.resolve(records).await {
            Ok(verified) => {
                for record in &verified {
                    self.metrics.inc_verifications(record.correct);
                }
                verified.len()
            }
            Err(e) => {
                error!("Verification of the pending prediction failed: {}", e);
                0
            }
        }
    }
}

#[async_trait]
impl PredictionJob for PredictionService {
    async fn run(&self) -> Result<JobReport, JobError> {
        let records = self.load_history().await?;
        let verified = self.verify_previous(&records).await;

        let batch = self.pipeline.predict(&records, Local::now().time())?;

        // Non-empty: the pipeline rejects short histories
        let newest = records.first().ok_or(PipelineError::InsufficientHistory {
            required: self.pipeline.config().required_history(),
            available: 0,
        })?;
        let target = next_draw_id(&newest.draw_id)
            .ok_or_else(|| JobError::UnknownNextCycle(newest.draw_id.clone()))?;

        self.ledger.record_prediction(&target, &batch).await?;
        log_prediction_summary(&target, &batch);

        Ok(JobReport {
            target_cycle_id: target,
            verified,
        })
    }
}

fn log_prediction_summary(target: &str, batch: &PredictionBatch) {
    let categories: Vec<&str> = batch.categories.iter().map(|c| c.as_str()).collect();
    let probabilities: Vec<String> = batch
        .probabilities
        .iter()
        .map(|p| format!("{:.1}%", p * 100.0))
        .collect();
    let trends: Vec<String> = batch
        .trends
        .iter()
        .map(|t| format!("{:.0}%", t * 100.0))
        .collect();

    info!(
        "Prediction for cycle {}: {:?} | digits {:?} | P(high) {:?} | recent high share {:?}",
        target, categories, batch.display_numbers, probabilities, trends
    );
}

impl From<ScorerError> for JobError {
    fn from(e: ScorerError) -> Self {
        JobError::Pipeline(PipelineError::Scorer(e))
    }
}
