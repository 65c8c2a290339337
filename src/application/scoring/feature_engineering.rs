//! Per-slot feature extraction over a binary High/Low history.
//!
//! Everything here is a pure function of the history window, the slot index and
//! the supplied time of day, so repeated calls are bit-for-bit identical.

use chrono::{NaiveTime, Timelike};
use std::f64::consts::PI;

use crate::domain::config::ScoringConfig;
use crate::domain::ml::feature_registry::{FeatureVector, SlotFeatures, features_to_vector};

/// Run lengths are divided by this before being handed to the scorers
pub const RUN_LENGTH_NORMALIZER: f64 = 10.0;

const VERY_SHORT_WINDOW: usize = 3;
const SHORT_WINDOW: usize = 5;
const MEDIUM_WINDOW: usize = 10;

/// Fraction of `1`s among the newest `n` outcomes of an oldest-first series.
/// Uses the whole series when it is shorter than `n`.
pub fn tail_high_ratio(series: &[u8], n: usize) -> f64 {
    let take = n.min(series.len());
    if take == 0 {
        return 0.0;
    }
    let highs = series[series.len() - take..]
        .iter()
        .filter(|&&v| v == 1)
        .count();
    highs as f64 / take as f64
}

/// Length of the run ending at the newest outcome
pub fn current_run_length(series: &[u8]) -> usize {
    let Some(&last) = series.last() else {
        return 0;
    };
    series.iter().rev().take_while(|&&v| v == last).count()
}

/// Longest run of identical outcomes anywhere in the series
pub fn longest_run_length(series: &[u8]) -> usize {
    let mut longest = 0;
    let mut run = 0;
    let mut previous = None;

    for &value in series {
        if previous == Some(value) {
            run += 1;
        } else {
            run = 1;
            previous = Some(value);
        }
        longest = longest.max(run);
    }
    longest
}

/// Computes the named features for one slot.
///
/// `window` is the slot's binary history, oldest first, already cut to the
/// configured history length.
pub fn compute_slot_features(
    window: &[u8],
    slot: usize,
    at: NaiveTime,
    config: &ScoringConfig,
) -> SlotFeatures {
    let hour = at.hour() as f64;
    let minute = at.minute() as f64;
    let hour_angle = 2.0 * PI * hour / 24.0;

    let short = tail_high_ratio(window, SHORT_WINDOW);
    let medium = tail_high_ratio(window, MEDIUM_WINDOW);
    let momentum = short - medium;
    let weight = config.positional_weight(slot);

    SlotFeatures {
        high_ratio: tail_high_ratio(window, window.len()),
        current_run_norm: current_run_length(window) as f64 / RUN_LENGTH_NORMALIZER,
        longest_run_norm: longest_run_length(window) as f64 / RUN_LENGTH_NORMALIZER,
        hour_norm: hour / 24.0,
        minute_norm: minute / 60.0,
        hour_sin: hour_angle.sin(),
        hour_cos: hour_angle.cos(),
        last3_high_ratio: tail_high_ratio(window, VERY_SHORT_WINDOW),
        last5_high_ratio: short,
        momentum_weighted: momentum * weight,
        short_ratio_weighted: short * weight,
        medium_ratio_weighted: medium * weight,
    }
}

/// Feature vector in registry order, ready for the scorers
pub fn extract_feature_vector(
    window: &[u8],
    slot: usize,
    at: NaiveTime,
    config: &ScoringConfig,
) -> FeatureVector {
    features_to_vector(&compute_slot_features(window, slot, at, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn config_w8() -> ScoringConfig {
        ScoringConfig::new(5, 8, 5, 0.05, 0.2, 0.1, 0.9).unwrap()
    }

    #[test]
    fn test_run_lengths() {
        assert_eq!(current_run_length(&[]), 0);
        assert_eq!(current_run_length(&[1, 0, 0, 0]), 3);
        assert_eq!(current_run_length(&[0, 1]), 1);
        assert_eq!(longest_run_length(&[]), 0);
        assert_eq!(longest_run_length(&[1, 1, 1, 0, 0, 1]), 3);
        assert_eq!(longest_run_length(&[0, 1, 0, 1]), 1);
    }

    #[test]
    fn test_tail_ratio_uses_available_outcomes() {
        assert_eq!(tail_high_ratio(&[1, 0, 1], 10), 2.0 / 3.0);
        assert_eq!(tail_high_ratio(&[1, 1, 0, 0, 0], 2), 0.0);
        assert_eq!(tail_high_ratio(&[], 5), 0.0);
    }

    #[test]
    fn test_window_of_eight_features() {
        let window = [1, 0, 0, 1, 1, 0, 1, 0];
        let at = NaiveTime::from_hms_opt(6, 30, 0).unwrap();
        let fs = compute_slot_features(&window, 0, at, &config_w8());

        assert!((fs.high_ratio - 0.5).abs() < EPS);
        assert!((fs.current_run_norm - 0.1).abs() < EPS);
        assert!((fs.longest_run_norm - 0.2).abs() < EPS);
        assert!((fs.hour_norm - 0.25).abs() < EPS);
        assert!((fs.minute_norm - 0.5).abs() < EPS);
        assert!((fs.hour_sin - 1.0).abs() < EPS);
        assert!(fs.hour_cos.abs() < EPS);
        assert!((fs.last3_high_ratio - 1.0 / 3.0).abs() < EPS);
        assert!((fs.last5_high_ratio - 0.6).abs() < EPS);
        // short 0.6, medium 0.5 over the whole window, weight 1/5
        assert!((fs.momentum_weighted - 0.02).abs() < EPS);
        assert!((fs.short_ratio_weighted - 0.12).abs() < EPS);
        assert!((fs.medium_ratio_weighted - 0.1).abs() < EPS);
    }

    #[test]
    fn test_extraction_is_bit_for_bit_reproducible() {
        let window = [1, 0, 0, 1, 1, 0, 1, 0];
        let at = NaiveTime::from_hms_opt(21, 7, 0).unwrap();
        let config = config_w8();

        let first = extract_feature_vector(&window, 3, at, &config);
        let second = extract_feature_vector(&window, 3, at, &config);

        let first_bits: Vec<u64> = first.as_slice().iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u64> = second.as_slice().iter().map(|v| v.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn test_positional_weight_scales_momentum_terms() {
        let window = [0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        let at = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        let config = ScoringConfig::default();

        let first = compute_slot_features(&window, 0, at, &config);
        let last = compute_slot_features(&window, 4, at, &config);

        assert!((last.short_ratio_weighted - 5.0 * first.short_ratio_weighted).abs() < EPS);
        assert!((last.momentum_weighted - 5.0 * first.momentum_weighted).abs() < EPS);
        // Unweighted fields do not depend on the slot
        assert_eq!(first.high_ratio, last.high_ratio);
        assert_eq!(first.last5_high_ratio, last.last5_high_ratio);
    }

    #[test]
    fn test_time_features_follow_clock() {
        // Time-of-day features come from the caller's clock, not from draw data
        let window = [1, 1, 1, 1, 1, 1, 1, 1];
        let config = config_w8();
        let morning = compute_slot_features(&window, 2, NaiveTime::from_hms_opt(6, 0, 0).unwrap(), &config);
        let evening = compute_slot_features(&window, 2, NaiveTime::from_hms_opt(18, 0, 0).unwrap(), &config);

        assert_ne!(morning.hour_norm, evening.hour_norm);
        assert!((morning.hour_sin + evening.hour_sin).abs() < EPS);
        assert_eq!(morning.high_ratio, evening.high_ratio);
    }
}
