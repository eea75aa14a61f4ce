//! Process-wide aggregation settings.
//!
//! Settings are read-mostly. The oracle keeps one [`AggregationSettings`]
//! value behind a lock and hands out copies, so a reader always sees a
//! quorum and threshold pair that were written together.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::Thresholds;
use crate::error::OracleError;
use crate::request::Severity;

/// When a request reads its quorum and thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsMode {
    /// Finalization reads the settings in force at finalize time, so admin
    /// changes apply to every pending request.
    #[default]
    Live,
    /// The settings in force when the request was opened are captured on
    /// the request and used for its finalization.
    Snapshot,
}

impl SettingsMode {
    /// Returns the mode as spelled in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for SettingsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The part of the settings that decides a request's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionRules {
    /// Minimum distinct submissions before finalization.
    pub quorum: u32,
    /// Classification boundaries.
    pub thresholds: Thresholds,
}

/// Admin-controlled aggregation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregationSettings {
    quorum: u32,
    thresholds: Thresholds,
    severity_bound: Option<Severity>,
    mode: SettingsMode,
}

impl AggregationSettings {
    /// Creates settings with live mode and no severity bound.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::InvalidArgument` if `quorum` is zero.
    pub fn new(quorum: u32, thresholds: Thresholds) -> Result<Self, OracleError> {
        validate_quorum(quorum)?;
        Ok(Self {
            quorum,
            thresholds,
            severity_bound: None,
            mode: SettingsMode::Live,
        })
    }

    /// Sets an upper bound on accepted severities.
    #[must_use]
    pub const fn with_severity_bound(mut self, bound: Option<Severity>) -> Self {
        self.severity_bound = bound;
        self
    }

    /// Sets the settings mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: SettingsMode) -> Self {
        self.mode = mode;
        self
    }

    /// Minimum distinct submissions before finalization.
    #[must_use]
    pub const fn quorum(&self) -> u32 {
        self.quorum
    }

    /// Classification boundaries.
    #[must_use]
    pub const fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Upper bound on accepted severities, if validation is enabled.
    #[must_use]
    pub const fn severity_bound(&self) -> Option<Severity> {
        self.severity_bound
    }

    /// When requests read their decision rules.
    #[must_use]
    pub const fn mode(&self) -> SettingsMode {
        self.mode
    }

    /// The quorum and thresholds currently in force.
    #[must_use]
    pub const fn rules(&self) -> DecisionRules {
        DecisionRules {
            quorum: self.quorum,
            thresholds: self.thresholds,
        }
    }

    /// Checks a severity against the configured bound.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::InvalidArgument` if a bound is set and
    /// `severity` exceeds it.
    pub fn check_severity(&self, severity: Severity) -> Result<(), OracleError> {
        match self.severity_bound {
            Some(bound) if severity > bound => Err(OracleError::invalid_argument(format!(
                "severity exceeds bound: {severity} > {bound}"
            ))),
            _ => Ok(()),
        }
    }

    pub(crate) fn set_quorum(&mut self, quorum: u32) -> Result<(), OracleError> {
        validate_quorum(quorum)?;
        self.quorum = quorum;
        Ok(())
    }

    pub(crate) const fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
    }

    pub(crate) const fn set_severity_bound(&mut self, bound: Option<Severity>) {
        self.severity_bound = bound;
    }
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            quorum: default_quorum(),
            thresholds: default_thresholds(),
            severity_bound: None,
            mode: SettingsMode::Live,
        }
    }
}

pub(crate) const fn default_quorum() -> u32 {
    3
}

pub(crate) const fn default_thresholds() -> Thresholds {
    match Thresholds::checked(20, 100) {
        Some(t) => t,
        None => unreachable!(),
    }
}

fn validate_quorum(quorum: u32) -> Result<(), OracleError> {
    if quorum == 0 {
        return Err(OracleError::invalid_argument("quorum must be positive"));
    }
    Ok(())
}
