use super::scorer::Scorer;
use crate::domain::errors::ScorerError;
use crate::domain::ml::{FEATURE_COUNT, FeatureVector};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Random forest scorer trained offline on High(1)/Low(0) labels and
/// serialized as JSON.
pub struct SmartCoreScorer {
    model: Option<Forest>,
    model_path: PathBuf,
    name: String,
}

impl SmartCoreScorer {
    pub fn new(model_path: PathBuf) -> Self {
        let name = format!(
            "SmartCore Random Forest ({})",
            model_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        let mut scorer = Self {
            model: None,
            model_path,
            name,
        };
        scorer.load_model();
        scorer
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn load_model(&mut self) {
        if !self.model_path.exists() {
            warn!(
                "Scorer model file not found at {:?}. Scorer will return neutral.",
                self.model_path
            );
            return;
        }

        match File::open(&self.model_path) {
            Ok(mut file) => {
                let mut buffer = Vec::new();
                if let Err(e) = file.read_to_end(&mut buffer) {
                    error!("Failed to read model file: {}", e);
                    return;
                }

                match serde_json::from_slice::<Forest>(&buffer) {
                    Ok(model) => {
                        info!("Successfully loaded scorer model from {:?}", self.model_path);
                        self.model = Some(model);
                    }
                    Err(e) => {
                        error!("Failed to deserialize scorer model: {}", e);
                    }
                }
            }
            Err(e) => {
                error!("Failed to open model file: {}", e);
            }
        }
    }

    fn failure(&self, reason: impl Into<String>) -> ScorerError {
        ScorerError::Failed {
            scorer: self.name.clone(),
            reason: reason.into(),
        }
    }
}

impl Scorer for SmartCoreScorer {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScorerError> {
        if features.len() != FEATURE_COUNT {
            return Err(ScorerError::FeatureMismatch {
                scorer: self.name.clone(),
                expected: FEATURE_COUNT,
                actual: features.len(),
            });
        }

        let Some(model) = &self.model else {
            return Ok(0.5); // Neutral
        };

        let input_matrix = DenseMatrix::from_2d_vec(&vec![features.as_slice().to_vec()])
            .map_err(|e| self.failure(format!("Matrix creation failed: {}", e)))?;

        let predictions = model
            .predict(&input_matrix)
            .map_err(|e| self.failure(format!("Prediction failed: {}", e)))?;

        predictions
            .first()
            .copied()
            .ok_or_else(|| self.failure("No prediction returned"))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "v1.0"
    }
}
