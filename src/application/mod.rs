// Verification ledger (pending prediction + accuracy)
pub mod ledger;

// Scorer ensemble members
pub mod ml;

// Countdown poller, prediction job and draw ingestion
pub mod scheduler;

// Feature extraction and the prediction pipeline
pub mod scoring;

// Wiring and shutdown
pub mod system;
