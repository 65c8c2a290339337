use super::scorer::Scorer;
use crate::domain::errors::ScorerError;
use crate::domain::ml::FeatureVector;

/// Scorer returning a fixed probability regardless of input.
///
/// Used as the neutral fallback when no model is configured, and as a stub in tests.
#[derive(Debug, Clone)]
pub struct ConstantScorer {
    probability: f64,
    name: String,
}

impl ConstantScorer {
    pub fn new(probability: f64) -> Self {
        Self {
            probability,
            name: format!("Constant({:.2})", probability),
        }
    }

    /// Neutral 0.5 scorer
    pub fn neutral() -> Self {
        Self::new(0.5)
    }
}

impl Scorer for ConstantScorer {
    fn score(&self, _features: &FeatureVector) -> Result<f64, ScorerError> {
        Ok(self.probability)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "v1"
    }
}
