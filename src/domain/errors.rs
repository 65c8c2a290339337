use thiserror::Error;

/// Errors raised while sampling the external countdown.
///
/// Every variant is transient from the scheduler's point of view: it is
/// counted towards the consecutive-error threshold and never stops the poller.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Countdown source unavailable: {reason}")]
    Transient { reason: String },

    #[error("Countdown read timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Invalid countdown value: {value} (valid range 0..={max})")]
    InvalidCountdownValue { value: i64, max: u32 },
}

impl ReadError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ReadError::Transient { .. } => "transient",
            ReadError::Timeout { .. } => "timeout",
            ReadError::InvalidCountdownValue { .. } => "invalid_value",
        }
    }
}

/// Failure of a single scorer in the ensemble
#[derive(Debug, Error, PartialEq)]
pub enum ScorerError {
    #[error("Scorer {scorer} failed: {reason}")]
    Failed { scorer: String, reason: String },

    #[error("Scorer {scorer} returned {value}, expected a probability in [0, 1]")]
    OutOfRange { scorer: String, value: f64 },

    #[error("Feature vector has {actual} fields, scorer {scorer} expects {expected}")]
    FeatureMismatch {
        scorer: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors that abort a scoring pipeline call. No partial predictions are produced.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("Insufficient history: need {required} draws, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Malformed draw {draw_id}: slot {slot} is not a digit")]
    MalformedRecord { draw_id: String, slot: usize },

    #[error("No scorers configured")]
    EmptyEnsemble,

    #[error(transparent)]
    Scorer(#[from] ScorerError),
}

/// Errors raised by the verification ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger persistence failed: {0}")]
    Persistence(#[source] anyhow::Error),

    #[error("Prediction for {cycle_id} has {actual} slots, expected {expected}")]
    SlotMismatch {
        cycle_id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Draw {draw_id} has no digit at slot {slot}")]
    MalformedDraw { draw_id: String, slot: usize },
}
