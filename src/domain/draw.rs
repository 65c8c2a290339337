//! Draw records and the per-slot binary history derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::PipelineError;

/// Digits at or above this value are classified as `High`
pub const HIGH_DIGIT_THRESHOLD: u8 = 5;

/// Binary classification of a single digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    High,
    Low,
}

impl Category {
    pub fn from_digit(digit: u8) -> Self {
        if digit >= HIGH_DIGIT_THRESHOLD {
            Category::High
        } else {
            Category::Low
        }
    }

    /// Inclusive digit range consistent with the category
    pub fn digit_range(&self) -> std::ops::RangeInclusive<u8> {
        match self {
            Category::High => HIGH_DIGIT_THRESHOLD..=9,
            Category::Low => 0..=(HIGH_DIGIT_THRESHOLD - 1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::High => "High",
            Category::Low => "Low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "High" => Some(Category::High),
            "Low" => Some(Category::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed cycle's outcome. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRecord {
    pub draw_id: String,
    pub numbers: Vec<String>,
    pub draw_time: DateTime<Utc>,
}

impl DrawRecord {
    pub fn new(draw_id: impl Into<String>, numbers: Vec<String>, draw_time: DateTime<Utc>) -> Self {
        Self {
            draw_id: draw_id.into(),
            numbers,
            draw_time,
        }
    }

    /// Digit at `slot`, or `None` when the slot is missing or not a single decimal digit.
    pub fn digit(&self, slot: usize) -> Option<u8> {
        let raw = self.numbers.get(slot)?.trim();
        let mut chars = raw.chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        c.to_digit(10).map(|d| d as u8)
    }

    pub fn category(&self, slot: usize) -> Option<Category> {
        self.digit(slot).map(Category::from_digit)
    }

    /// True when the id is a plain decimal string and the record has exactly
    /// `slot_count` digit slots
    pub fn is_well_formed(&self, slot_count: usize) -> bool {
        self.numeric_id().is_some()
            && self.numbers.len() == slot_count
            && (0..slot_count).all(|s| self.digit(s).is_some())
    }

    /// Numeric value of the draw id, when it is a plain decimal string
    pub fn numeric_id(&self) -> Option<u64> {
        self.draw_id.trim().parse::<u64>().ok()
    }
}

/// Orders records newest first by numeric draw id, then draw time, then raw id.
///
/// Records with a non-decimal id sort after every numeric one, so the order is
/// total and does not depend on the input order.
pub fn sort_newest_first(records: &mut [DrawRecord]) {
    records.sort_by(|a, b| {
        b.numeric_id()
            .cmp(&a.numeric_id())
            .then_with(|| b.draw_time.cmp(&a.draw_time))
            .then_with(|| b.draw_id.cmp(&a.draw_id))
    });
}

/// Identifier of the cycle following `draw_id`, preserving zero padding.
///
/// Returns `None` when the id is not a decimal string.
pub fn next_draw_id(draw_id: &str) -> Option<String> {
    let trimmed = draw_id.trim();
    let value = trimmed.parse::<u64>().ok()?;
    let next = value.checked_add(1)?;
    Some(format!("{:0width$}", next, width = trimmed.len()))
}

/// Binary outcome series for one slot, oldest first.
///
/// `records` must be sorted newest first; only the newest `window` records are used.
pub fn history_series(
    records: &[DrawRecord],
    slot: usize,
    window: usize,
) -> Result<Vec<u8>, PipelineError> {
    if records.len() < window {
        return Err(PipelineError::InsufficientHistory {
            required: window,
            available: records.len(),
        });
    }

    records[..window]
        .iter()
        .rev()
        .map(|record| match record.category(slot) {
            Some(Category::High) => Ok(1),
            Some(Category::Low) => Ok(0),
            None => Err(PipelineError::MalformedRecord {
                draw_id: record.draw_id.clone(),
                slot,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draw(id: &str, digits: &str) -> DrawRecord {
        DrawRecord::new(
            id,
            digits.chars().map(|c| c.to_string()).collect(),
            Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(Category::from_digit(4), Category::Low);
        assert_eq!(Category::from_digit(5), Category::High);
        assert_eq!(Category::from_digit(0), Category::Low);
        assert_eq!(Category::from_digit(9), Category::High);
        assert_eq!(Category::High.digit_range(), 5..=9);
        assert_eq!(Category::Low.digit_range(), 0..=4);
    }

    #[test]
    fn test_digit_parsing_rejects_garbage() {
        let record = DrawRecord::new(
            "1",
            vec!["7".into(), " 3 ".into(), "x".into(), "12".into(), "".into()],
            Utc::now(),
        );
        assert_eq!(record.digit(0), Some(7));
        assert_eq!(record.digit(1), Some(3));
        assert_eq!(record.digit(2), None);
        assert_eq!(record.digit(3), None);
        assert_eq!(record.digit(4), None);
        assert_eq!(record.digit(5), None);
        assert!(!record.is_well_formed(5));
        assert!(draw("2", "01234").is_well_formed(5));
    }

    #[test]
    fn test_sort_newest_first_uses_numeric_id() {
        let mut records = vec![draw("99", "00000"), draw("101", "11111"), draw("100", "22222")];
        sort_newest_first(&mut records);
        let ids: Vec<&str> = records.iter().map(|r| r.draw_id.as_str()).collect();
        assert_eq!(ids, vec!["101", "100", "99"]);
    }

    #[test]
    fn test_sort_with_non_numeric_id_ignores_input_order() {
        let at = |id: &str, hour: u32| {
            DrawRecord::new(
                id,
                vec!["1".into(); 5],
                Utc.with_ymd_and_hms(2026, 10, 19, hour, 0, 0).unwrap(),
            )
        };
        let mut forward = vec![at("100", 1), at("x", 2), at("99", 3)];
        let mut backward = vec![at("99", 3), at("x", 2), at("100", 1)];
        sort_newest_first(&mut forward);
        sort_newest_first(&mut backward);

        let ids = |r: &[DrawRecord]| r.iter().map(|d| d.draw_id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&forward), vec!["100", "99", "x"]);
        assert_eq!(ids(&forward), ids(&backward));
    }

    #[test]
    fn test_non_decimal_id_is_not_well_formed() {
        assert!(!draw("x42", "01234").is_well_formed(5));
        assert!(!draw("", "01234").is_well_formed(5));
        assert!(draw("0042", "01234").is_well_formed(5));
    }

    #[test]
    fn test_next_draw_id_preserves_padding() {
        assert_eq!(next_draw_id("0099").as_deref(), Some("0100"));
        assert_eq!(next_draw_id("41").as_deref(), Some("42"));
        assert_eq!(next_draw_id("999").as_deref(), Some("1000"));
        assert_eq!(next_draw_id("abc"), None);
    }

    #[test]
    fn test_history_series_is_oldest_first() {
        // newest first: 103 high, 102 low, 101 high
        let records = vec![draw("103", "90000"), draw("102", "10000"), draw("101", "50000")];
        let series = history_series(&records, 0, 3).unwrap();
        assert_eq!(series, vec![1, 0, 1]);

        let series = history_series(&records, 0, 2).unwrap();
        assert_eq!(series, vec![0, 1]);
    }

    #[test]
    fn test_history_series_requires_window() {
        let records = vec![draw("1", "00000")];
        let err = history_series(&records, 0, 2).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InsufficientHistory {
                required: 2,
                available: 1
            }
        );
    }

    #[test]
    fn test_history_series_flags_malformed_slot() {
        let mut bad = draw("7", "00000");
        bad.numbers[3] = "?".into();
        let err = history_series(&[bad], 3, 1).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { slot: 3, .. }));
    }
}
