//! Property-Based Tests for threshold matching and label extraction
//!
//! # Test Properties
//!
//! 1. **First Match**: the first range containing the value is returned
//! 2. **Fallback**: no containing range yields `[v, v]` with no color
//! 3. **Inclusive Bounds**: both ends of a range match
//! 4. **Label Presence**: extraction fails iff the first series lacks the label

#![cfg(test)]

use proptest::prelude::*;

use super::extract::extract_label;
use super::threshold::match_color;
use crate::catalog::ColorRange;
use crate::domain::query::{LabelSet, QueryResult, Sample, SamplePair};

// =============================================================================
// Property Strategies
// =============================================================================

/// Ranges with `min <= max` over a small integer grid so overlaps are common.
fn range_strategy() -> impl Strategy<Value = ColorRange> {
    (-100i32..100, 0i32..50, "[a-z]{1,8}").prop_map(|(min, width, color)| {
        ColorRange::new(f64::from(min), f64::from(min + width), color)
    })
}

fn ranges_strategy() -> impl Strategy<Value = Vec<ColorRange>> {
    prop::collection::vec(range_strategy(), 0..8)
}

fn labels_strategy() -> impl Strategy<Value = LabelSet> {
    prop::collection::btree_map("[a-z_]{1,6}", "[a-z0-9]{0,6}", 0..5)
}

fn vector(labels: LabelSet) -> QueryResult {
    QueryResult::Vector(vec![Sample::new(labels, SamplePair::new(1.0, 1.0))])
}

// =============================================================================
// Threshold Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The returned range is the first one in declared order containing the value.
    #[test]
    fn prop_first_match_wins(ranges in ranges_strategy(), value in -150.0f64..150.0) {
        let matched = match_color(&ranges, value);

        match ranges.iter().position(|r| r.min <= value && value <= r.max) {
            Some(index) => prop_assert_eq!(matched, ranges[index].clone()),
            None => {
                prop_assert_eq!(matched.min, value);
                prop_assert_eq!(matched.max, value);
                prop_assert!(matched.color.is_empty());
                prop_assert!(matched.value_override.is_empty());
            }
        }
    }

    /// Both bounds of a lone range are inclusive.
    #[test]
    fn prop_bounds_inclusive(range in range_strategy()) {
        let ranges = vec![range.clone()];
        prop_assert_eq!(match_color(&ranges, range.min), range.clone());
        prop_assert_eq!(match_color(&ranges, range.max), range);
    }

    /// Empty input always falls back.
    #[test]
    fn prop_empty_ranges_fallback(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let matched = match_color(&[], value);
        prop_assert_eq!(matched, ColorRange::new(value, value, ""));
    }
}

// =============================================================================
// Label Extraction Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Extraction succeeds exactly when the first series carries the label.
    #[test]
    fn prop_label_presence(labels in labels_strategy(), label in "[a-z_]{1,6}") {
        let expected = labels.get(&label).cloned();
        let result = extract_label(&vector(labels), &label);

        match expected {
            Some(value) => prop_assert_eq!(result.ok(), Some(value)),
            None => prop_assert!(result.is_err()),
        }
    }

    /// No series never yields a label.
    #[test]
    fn prop_no_series_fails(label in "[a-z_]{1,6}") {
        prop_assert!(extract_label(&QueryResult::Vector(vec![]), &label).is_err());
    }
}
