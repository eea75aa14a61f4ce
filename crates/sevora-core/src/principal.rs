//! Caller identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An authenticated caller identity: an administrator, a source, or any
/// other party.
///
/// The empty (or all-whitespace) identity is the null principal. It can be
/// constructed, because transports may hand it over, but it is never accepted
/// as an administrator or as a source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Creates a principal from its textual identity.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the null principal.
    #[must_use]
    pub const fn null() -> Self {
        Self(String::new())
    }

    /// Returns `true` if this is the null identity.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "<null>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_detection() {
        assert!(Principal::null().is_null());
        assert!(Principal::new("   ").is_null());
        assert!(!Principal::new("station-a").is_null());
    }

    #[test]
    fn display_marks_null() {
        assert_eq!(Principal::null().to_string(), "<null>");
        assert_eq!(Principal::from("ops").to_string(), "ops");
    }
}
