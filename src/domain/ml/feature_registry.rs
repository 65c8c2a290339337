use serde::{Deserialize, Serialize};

/// Ordered list of feature names.
/// This order MUST match exactly the order the scorers were trained with.
/// Any change here is a breaking change for every serialized model.
pub const FEATURE_NAMES: &[&str] = &[
    "high_ratio",
    "current_run_norm",
    "longest_run_norm",
    "hour_norm",
    "minute_norm",
    "hour_sin",
    "hour_cos",
    "last3_high_ratio",
    "last5_high_ratio",
    "momentum_weighted",
    "short_ratio_weighted",
    "medium_ratio_weighted",
];

pub const FEATURE_COUNT: usize = 12;

/// Named per-slot features, computed by the scoring pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotFeatures {
    pub high_ratio: f64,
    pub current_run_norm: f64,
    pub longest_run_norm: f64,
    pub hour_norm: f64,
    pub minute_norm: f64,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub last3_high_ratio: f64,
    pub last5_high_ratio: f64,
    pub momentum_weighted: f64,
    pub short_ratio_weighted: f64,
    pub medium_ratio_weighted: f64,
}

/// Fixed-length, fixed-order input handed to every scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// Flattens named features into the registry order.
pub fn features_to_vector(fs: &SlotFeatures) -> FeatureVector {
    FeatureVector(vec![
        fs.high_ratio,
        fs.current_run_norm,
        fs.longest_run_norm,
        fs.hour_norm,
        fs.minute_norm,
        fs.hour_sin,
        fs.hour_cos,
        fs.last3_high_ratio,
        fs.last5_high_ratio,
        fs.momentum_weighted,
        fs.short_ratio_weighted,
        fs.medium_ratio_weighted,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_length() {
        let vec = features_to_vector(&SlotFeatures::default());
        assert_eq!(vec.len(), FEATURE_NAMES.len());
        assert_eq!(vec.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_feature_consistency() {
        let fs = SlotFeatures {
            high_ratio: 0.7,
            medium_ratio_weighted: 0.25,
            ..Default::default()
        };

        let vec = features_to_vector(&fs);
        // high_ratio is index 0
        assert_eq!(vec.as_slice()[0], 0.7);
        // medium_ratio_weighted is last index (11)
        assert_eq!(vec.as_slice()[11], 0.25);
    }
}
