use crate::domain::errors::ScorerError;
use crate::domain::ml::FeatureVector;

/// Interface for the opaque probability models of the ensemble
pub trait Scorer: Send + Sync {
    /// Probability (0.0 to 1.0) that the next digit of the slot is High
    fn score(&self, features: &FeatureVector) -> Result<f64, ScorerError>;

    /// Get model name/type
    fn name(&self) -> &str;

    /// Get model version/id
    fn version(&self) -> &str;
}
