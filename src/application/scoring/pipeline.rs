use chrono::NaiveTime;
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

use super::feature_engineering::{extract_feature_vector, tail_high_ratio};
use crate::application::ml::Scorer;
use crate::domain::config::ScoringConfig;
use crate::domain::draw::{Category, DrawRecord, history_series};
use crate::domain::errors::{PipelineError, ScorerError};
use crate::domain::ml::FeatureVector;
use crate::domain::prediction::PredictionBatch;

/// Decision threshold: clamped probabilities strictly above it predict `High`
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Intermediate values of one slot's probability, kept for logging and tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotScore {
    pub slot: usize,
    pub base_probability: f64,
    pub position_bias: f64,
    pub trend: f64,
    pub trend_bias: f64,
    pub probability: f64,
}

impl SlotScore {
    pub fn category(&self) -> Category {
        if self.probability > DECISION_THRESHOLD {
            Category::High
        } else {
            Category::Low
        }
    }
}

/// Scoring Pipeline
///
/// Turns newest-first draw history into one category, one illustrative digit and
/// one probability per slot:
/// - Features over the newest `history_window` outcomes of the slot
/// - Unweighted mean of every scorer in the static ensemble
/// - Positional bias `(slot - center) * step`, trend bias `(trend - 0.5) * step`
/// - Clamp into the configured safety band
///
/// Any slot failure aborts the whole call.
#[derive(Clone)]
pub struct ScoringPipeline {
    scorers: Vec<Arc<dyn Scorer>>,
    config: ScoringConfig,
}

impl ScoringPipeline {
    pub fn new(scorers: Vec<Arc<dyn Scorer>>, config: ScoringConfig) -> Self {
        Self { scorers, config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn scorer_names(&self) -> Vec<String> {
        self.scorers
            .iter()
            .map(|s| format!("{} {}", s.name(), s.version()))
            .collect()
    }

    /// Predict every slot using the thread-local RNG for illustrative digits.
    ///
    /// `records` must be sorted newest first. `at` is the wall-clock time used
    /// for the time-of-day features.
    pub fn predict(
        &self,
        records: &[DrawRecord],
        at: NaiveTime,
    ) -> Result<PredictionBatch, PipelineError> {
        let mut rng = rand::rng();
        self.predict_with_rng(records, at, &mut rng)
    }

    pub fn predict_with_rng<R: Rng + ?Sized>(
        &self,
        records: &[DrawRecord],
        at: NaiveTime,
        rng: &mut R,
    ) -> Result<PredictionBatch, PipelineError> {
        let scores = self.score_all(records, at)?;

        let mut batch = PredictionBatch {
            categories: Vec::with_capacity(scores.len()),
            display_numbers: Vec::with_capacity(scores.len()),
            probabilities: Vec::with_capacity(scores.len()),
            trends: Vec::with_capacity(scores.len()),
        };

        for score in &scores {
            let category = score.category();
            batch.categories.push(category);
            batch.display_numbers.push(rng.random_range(category.digit_range()));
            batch.probabilities.push(score.probability);
            batch.trends.push(score.trend);
        }

        Ok(batch)
    }

    /// Deterministic part of the pipeline: probabilities for every slot, in slot order.
    pub fn score_all(
        &self,
        records: &[DrawRecord],
        at: NaiveTime,
    ) -> Result<Vec<SlotScore>, PipelineError> {
        if self.scorers.is_empty() {
            return Err(PipelineError::EmptyEnsemble);
        }

        let required = self.config.required_history();
        if records.len() < required {
            return Err(PipelineError::InsufficientHistory {
                required,
                available: records.len(),
            });
        }

        (0..self.config.slot_count)
            .map(|slot| self.score_slot(records, slot, at))
            .collect()
    }

    pub fn score_slot(
        &self,
        records: &[DrawRecord],
        slot: usize,
        at: NaiveTime,
    ) -> Result<SlotScore, PipelineError> {
        let window = history_series(records, slot, self.config.history_window)?;
        let features = extract_feature_vector(&window, slot, at, &self.config);
        let base_probability = self.ensemble_probability(&features)?;

        let recent = history_series(records, slot, self.config.trend_window)?;
        let trend = tail_high_ratio(&recent, recent.len());

        let position_bias = self.position_bias(slot);
        let trend_bias = (trend - 0.5) * self.config.trend_bias_step;
        let probability = self.config.clamp(base_probability + position_bias + trend_bias);

        debug!(
            "Slot {}: base={:.4} position_bias={:+.3} trend={:.2} trend_bias={:+.3} final={:.4}",
            slot, base_probability, position_bias, trend, trend_bias, probability
        );

        Ok(SlotScore {
            slot,
            base_probability,
            position_bias,
            trend,
            trend_bias,
            probability,
        })
    }

    /// Unweighted mean of all scorers. Rejects non-finite or out-of-range scores.
    pub fn ensemble_probability(&self, features: &FeatureVector) -> Result<f64, ScorerError> {
        let mut sum = 0.0;
        for scorer in &self.scorers {
            let value = scorer.score(features)?;
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ScorerError::OutOfRange {
                    scorer: scorer.name().to_string(),
                    value,
                });
            }
            sum += value;
        }
        Ok(sum / self.scorers.len() as f64)
    }

    /// Edge slots skew away from the center slot, which gets zero bias
    pub fn position_bias(&self, slot: usize) -> f64 {
        (slot as f64 - self.config.center_slot()) * self.config.position_bias_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::ConstantScorer;
    use chrono::{Duration, TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct FailingScorer;

    impl Scorer for FailingScorer {
        fn score(&self, _features: &FeatureVector) -> Result<f64, ScorerError> {
            Err(ScorerError::Failed {
                scorer: "failing".to_string(),
                reason: "model unavailable".to_string(),
            })
        }
        fn name(&self) -> &str {
            "failing"
        }
        fn version(&self) -> &str {
            "v0"
        }
    }

    /// Newest-first records built from per-draw digit strings (index 0 = newest)
    fn records(digits: &[&str]) -> Vec<DrawRecord> {
        let base = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        let newest_id = 5000 + digits.len() as u64;
        digits
            .iter()
            .enumerate()
            .map(|(i, d)| {
                DrawRecord::new(
                    (newest_id - i as u64).to_string(),
                    d.chars().map(|c| c.to_string()).collect(),
                    base - Duration::minutes(3 * i as i64),
                )
            })
            .collect()
    }

    fn uniform(digits: &str, n: usize) -> Vec<DrawRecord> {
        records(&vec![digits; n])
    }

    fn pipeline(probabilities: &[f64]) -> ScoringPipeline {
        let scorers: Vec<Arc<dyn Scorer>> = probabilities
            .iter()
            .map(|p| Arc::new(ConstantScorer::new(*p)) as Arc<dyn Scorer>)
            .collect();
        ScoringPipeline::new(scorers, ScoringConfig::default())
    }

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn test_ensemble_is_unweighted_mean() {
        let p = pipeline(&[0.2, 0.4, 0.9]);
        let features = extract_feature_vector(&[1, 0, 1], 0, noon(), p.config());
        let mean = p.ensemble_probability(&features).unwrap();
        assert!((mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_position_bias_is_monotonic_and_zero_at_center() {
        let p = pipeline(&[0.5]);
        let biases: Vec<f64> = (0..5).map(|s| p.position_bias(s)).collect();

        assert_eq!(biases[2], 0.0);
        assert!(biases.windows(2).all(|w| w[0] < w[1]));
        assert!((biases[0] + 0.1).abs() < 1e-12);
        assert!((biases[4] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_neutral_inputs_follow_position_bias() {
        // Alternating history -> trend over the newest 5 draws is 3/5 for "5" newest
        let mut digits = Vec::new();
        for i in 0..10 {
            digits.push(if i % 2 == 0 { "55555" } else { "00000" });
        }
        let p = pipeline(&[0.5]);
        let scores = p.score_all(&records(&digits), noon()).unwrap();

        // trend = 3/5 high -> +0.02 on every slot
        for score in &scores {
            assert!((score.trend - 0.6).abs() < 1e-12);
            assert!((score.trend_bias - 0.02).abs() < 1e-12);
        }
        assert!((scores[0].probability - 0.42).abs() < 1e-12);
        assert!((scores[2].probability - 0.52).abs() < 1e-12);
        assert!((scores[4].probability - 0.62).abs() < 1e-12);

        let categories: Vec<Category> = scores.iter().map(|s| s.category()).collect();
        assert_eq!(
            categories,
            vec![
                Category::Low,
                Category::Low,
                Category::High,
                Category::High,
                Category::High
            ]
        );
    }

    #[test]
    fn test_output_never_leaves_clamp_band() {
        let histories = [uniform("99999", 12), uniform("00000", 12)];
        for constant in [0.0, 0.05, 0.5, 0.95, 1.0] {
            let p = pipeline(&[constant]);
            for history in &histories {
                let batch = p.predict(history, noon()).unwrap();
                for prob in &batch.probabilities {
                    assert!(
                        (0.1..=0.9).contains(prob),
                        "probability {} escaped band for constant {}",
                        prob,
                        constant
                    );
                }
            }
        }
    }

    #[test]
    fn test_display_digits_match_categories() {
        let p = pipeline(&[0.5]);
        let history = records(&[
            "90909", "90909", "90909", "90909", "90909", "09090", "09090", "09090", "09090",
            "09090",
        ]);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let batch = p.predict_with_rng(&history, noon(), &mut rng).unwrap();
            assert_eq!(batch.slot_count(), 5);
            for (category, digit) in batch.categories.iter().zip(&batch.display_numbers) {
                assert!(category.digit_range().contains(digit));
            }
        }
    }

    #[test]
    fn test_insufficient_history_is_propagated() {
        let p = pipeline(&[0.5]);
        let err = p.predict(&uniform("12345", 9), noon()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InsufficientHistory {
                required: 10,
                available: 9
            }
        );
    }

    #[test]
    fn test_scorer_failure_aborts_call() {
        let scorers: Vec<Arc<dyn Scorer>> =
            vec![Arc::new(ConstantScorer::neutral()), Arc::new(FailingScorer)];
        let p = ScoringPipeline::new(scorers, ScoringConfig::default());

        let err = p.predict(&uniform("12345", 10), noon()).unwrap_err();
        assert!(matches!(err, PipelineError::Scorer(ScorerError::Failed { .. })));
    }

    #[test]
    fn test_out_of_range_scorer_rejected() {
        let p = pipeline(&[1.3]);
        let err = p.predict(&uniform("12345", 10), noon()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Scorer(ScorerError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_malformed_record_aborts_call() {
        let p = pipeline(&[0.5]);
        let mut history = uniform("12345", 10);
        history[3].numbers.truncate(2);

        let err = p.predict(&history, noon()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { slot: 2, .. }));
    }

    #[test]
    fn test_empty_ensemble_rejected() {
        let p = ScoringPipeline::new(Vec::new(), ScoringConfig::default());
        assert_eq!(
            p.predict(&uniform("12345", 10), noon()).unwrap_err(),
            PipelineError::EmptyEnsemble
        );
    }
}
