//! Threshold classification of an aggregated severity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::request::Severity;

/// Discrete outcome handed to the downstream policy engine.
///
/// Categories are ordered: `Small < Medium < Large`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Below the medium threshold.
    #[serde(rename = "S")]
    Small,
    /// At or above the medium threshold, below the large threshold.
    #[serde(rename = "M")]
    Medium,
    /// At or above the large threshold.
    #[serde(rename = "L")]
    Large,
}

impl Category {
    /// Returns the single-byte wire code (`b'S'`, `b'M'` or `b'L'`).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Small => b'S',
            Self::Medium => b'M',
            Self::Large => b'L',
        }
    }

    /// Parses a wire code back into a category.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            b'S' => Some(Self::Small),
            b'M' => Some(Self::Medium),
            b'L' => Some(Self::Large),
            _ => None,
        }
    }

    /// Returns the wire code as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "S",
            Self::Medium => "M",
            Self::Large => "L",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two classification boundaries. `medium < large` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds", into = "RawThresholds")]
pub struct Thresholds {
    medium: Severity,
    large: Severity,
}

impl Thresholds {
    /// Creates a threshold pair.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::InvalidArgument` unless `medium < large`.
    pub fn new(medium: Severity, large: Severity) -> Result<Self, OracleError> {
        Self::checked(medium, large).ok_or_else(|| {
            OracleError::invalid_argument(format!(
                "medium threshold must be below large threshold: {medium} >= {large}"
            ))
        })
    }

    /// Creates a threshold pair, or `None` unless `medium < large`.
    #[must_use]
    pub const fn checked(medium: Severity, large: Severity) -> Option<Self> {
        if medium < large {
            Some(Self { medium, large })
        } else {
            None
        }
    }

    /// Lower bound of the `M` category.
    #[must_use]
    pub const fn medium(&self) -> Severity {
        self.medium
    }

    /// Lower bound of the `L` category.
    #[must_use]
    pub const fn large(&self) -> Severity {
        self.large
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThresholds {
    medium: Severity,
    large: Severity,
}

impl TryFrom<RawThresholds> for Thresholds {
    type Error = OracleError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        Self::new(raw.medium, raw.large)
    }
}

impl From<Thresholds> for RawThresholds {
    fn from(t: Thresholds) -> Self {
        Self {
            medium: t.medium,
            large: t.large,
        }
    }
}

/// Maps an aggregated severity to its category.
///
/// Each threshold belongs to the tier above it.
#[must_use]
pub const fn classify(median: Severity, thresholds: Thresholds) -> Category {
    if median < thresholds.medium {
        Category::Small
    } else if median < thresholds.large {
        Category::Medium
    } else {
        Category::Large
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_go_to_the_upper_tier() {
        let t = Thresholds::new(20, 100).unwrap();
        assert_eq!(classify(0, t), Category::Small);
        assert_eq!(classify(19, t), Category::Small);
        assert_eq!(classify(20, t), Category::Medium);
        assert_eq!(classify(99, t), Category::Medium);
        assert_eq!(classify(100, t), Category::Large);
        assert_eq!(classify(u16::MAX, t), Category::Large);
    }

    #[test]
    fn thresholds_must_be_strictly_ordered() {
        assert!(Thresholds::new(100, 100).is_err());
        assert!(Thresholds::new(101, 100).is_err());
        assert!(Thresholds::new(0, 1).is_ok());
    }

    #[test]
    fn zero_medium_threshold_has_no_small_tier() {
        let t = Thresholds::new(0, 10).unwrap();
        assert_eq!(classify(0, t), Category::Medium);
    }

    #[test]
    fn wire_codes() {
        for category in [Category::Small, Category::Medium, Category::Large] {
            assert_eq!(Category::from_code(category.code()), Some(category));
        }
        assert_eq!(Category::Large.code(), b'L');
        assert_eq!(Category::from_code(b'X'), None);
    }

    #[test]
    fn categories_are_ordered() {
        assert!(Category::Small < Category::Medium);
        assert!(Category::Medium < Category::Large);
    }

    #[test]
    fn deserialize_rejects_unordered_thresholds() {
        let ok: Result<Thresholds, _> = serde_json::from_str(r#"{"medium":20,"large":100}"#);
        assert_eq!(ok.unwrap(), Thresholds::new(20, 100).unwrap());
        let bad: Result<Thresholds, _> = serde_json::from_str(r#"{"medium":100,"large":20}"#);
        assert!(bad.is_err());
    }
}
