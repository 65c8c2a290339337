pub mod feature_engineering;
pub mod pipeline;

pub use pipeline::{DECISION_THRESHOLD, ScoringPipeline, SlotScore};
