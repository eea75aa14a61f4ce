//! Property-based tests for the median and classifier.

use proptest::prelude::*;

use super::{Category, Thresholds, classify, median};

/// Strategy for a non-empty batch of severities as a small quorum produces.
fn severities() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(any::<u16>(), 1..=7)
}

/// Strategy for a valid threshold pair.
fn thresholds() -> impl Strategy<Value = Thresholds> {
    (0u16..u16::MAX)
        .prop_flat_map(|medium| (Just(medium), (medium + 1)..=u16::MAX))
        .prop_map(|(medium, large)| Thresholds::new(medium, large).unwrap())
}

proptest! {
    /// Property: the median matches the textbook definition.
    #[test]
    fn prop_median_matches_reference(values in severities()) {
        let mut sorted = values.clone();
        sorted.sort_unstable();
        let n = sorted.len();
        let expected = if n % 2 == 1 {
            u64::from(sorted[n / 2])
        } else {
            (u64::from(sorted[n / 2 - 1]) + u64::from(sorted[n / 2])) / 2
        };
        prop_assert_eq!(u64::from(median(&values).unwrap()), expected);
    }

    /// Property: the median does not depend on submission order.
    #[test]
    fn prop_median_is_order_independent(values in severities()) {
        let mut reversed = values.clone();
        reversed.reverse();
        prop_assert_eq!(median(&values).unwrap(), median(&reversed).unwrap());
    }

    /// Property: the median lies between the smallest and largest input.
    #[test]
    fn prop_median_is_bounded(values in severities()) {
        let m = median(&values).unwrap();
        prop_assert!(m >= *values.iter().min().unwrap());
        prop_assert!(m <= *values.iter().max().unwrap());
    }

    /// Property: classification is monotone in the severity.
    #[test]
    fn prop_classify_is_monotone(t in thresholds(), a in any::<u16>(), b in any::<u16>()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(classify(lo, t) <= classify(hi, t));
    }

    /// Property: each tier is exactly the half-open interval it names.
    #[test]
    fn prop_classify_matches_intervals(t in thresholds(), v in any::<u16>()) {
        let expected = if v < t.medium() {
            Category::Small
        } else if v < t.large() {
            Category::Medium
        } else {
            Category::Large
        };
        prop_assert_eq!(classify(v, t), expected);
    }
}
