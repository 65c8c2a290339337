pub mod countdown_scheduler;
pub mod ingestion;
pub mod prediction_job;

pub use countdown_scheduler::CountdownScheduler;
pub use ingestion::{IngestReport, IngestionService};
pub use prediction_job::{JobError, JobReport, PredictionJob, PredictionService};
