//! Configuration domain module
//!
//! Domain value objects for the scheduler and the scoring pipeline, validated
//! on construction and built from the environment-facing `crate::config`.

pub mod cycle_config;
pub mod scoring_config;

pub use cycle_config::{CycleConfig, CycleConfigError};
pub use scoring_config::{ScoringConfig, ScoringConfigError};
