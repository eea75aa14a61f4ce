//! Per-request aggregation state.
//!
//! An [`AggregationRequest`] moves through two states:
//!
//! ```text
//! open(id) ──► Open ──finalize──► Finalized
//!               ▲                     │
//!               └──────open(id)───────┘
//! ```
//!
//! `Open` accepts one submission per source. `Finalized` is terminal until
//! the host re-opens the same identifier, which discards everything the
//! request held.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::principal::Principal;
use crate::settings::DecisionRules;

/// A reported severity.
pub type Severity = u16;

/// Opaque request identifier assigned by the host, never generated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Wraps a host-assigned identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Collecting submissions.
    Open,
    /// Sealed; no further submissions or finalizations.
    Finalized,
}

/// One accepted severity report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// The reporting source.
    pub source: Principal,
    /// The reported severity.
    pub severity: Severity,
}

/// Aggregation state for a single request identifier.
#[derive(Debug, Clone)]
pub struct AggregationRequest {
    id: RequestId,
    state: RequestState,
    submissions: Vec<Submission>,
    submitted_by: BTreeSet<Principal>,
    pinned_rules: Option<DecisionRules>,
}

impl AggregationRequest {
    /// Creates an open request with no submissions.
    ///
    /// `pinned_rules` carries the quorum and thresholds captured at open time
    /// when the oracle runs in snapshot mode.
    #[must_use]
    pub const fn new(id: RequestId, pinned_rules: Option<DecisionRules>) -> Self {
        Self {
            id,
            state: RequestState::Open,
            submissions: Vec::new(),
            submitted_by: BTreeSet::new(),
            pinned_rules,
        }
    }

    /// Discards all submissions and returns the request to `Open`.
    pub fn reset(&mut self, pinned_rules: Option<DecisionRules>) {
        self.state = RequestState::Open;
        self.submissions.clear();
        self.submitted_by.clear();
        self.pinned_rules = pinned_rules;
    }

    /// The lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RequestState {
        self.state
    }

    /// Returns `true` once the request has been finalized.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        matches!(self.state, RequestState::Finalized)
    }

    /// Accepted submissions in arrival order.
    #[must_use]
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Number of accepted submissions.
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.submissions.len()
    }

    /// The submitted severities in arrival order.
    #[must_use]
    pub fn severities(&self) -> Vec<Severity> {
        self.submissions.iter().map(|s| s.severity).collect()
    }

    /// Returns `true` if `source` has already submitted since the last open.
    #[must_use]
    pub fn has_submitted(&self, source: &Principal) -> bool {
        self.submitted_by.contains(source)
    }

    /// Decision rules captured at open time, if any.
    #[must_use]
    pub const fn pinned_rules(&self) -> Option<DecisionRules> {
        self.pinned_rules
    }

    /// Records a severity from `source`.
    ///
    /// The caller is responsible for the capability check; this only
    /// enforces the state rules.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::AlreadyFinalized` if the request is sealed, or
    /// `OracleError::DuplicateSubmission` if `source` already submitted.
    pub fn record(&mut self, source: &Principal, severity: Severity) -> Result<(), OracleError> {
        if self.is_finalized() {
            return Err(OracleError::AlreadyFinalized { request_id: self.id });
        }
        if !self.submitted_by.insert(source.clone()) {
            return Err(OracleError::DuplicateSubmission {
                request_id: self.id,
                source_id: source.clone(),
            });
        }
        self.submissions.push(Submission {
            source: source.clone(),
            severity,
        });
        Ok(())
    }

    /// Seals the request.
    pub(crate) fn seal(&mut self) {
        self.state = RequestState::Finalized;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AggregationRequest {
        AggregationRequest::new(RequestId::new(1), None)
    }

    #[test]
    fn new_request_is_open_and_empty() {
        let req = request();
        assert_eq!(req.state(), RequestState::Open);
        assert_eq!(req.submission_count(), 0);
        assert!(req.pinned_rules().is_none());
    }

    #[test]
    fn record_appends_in_order() {
        let mut req = request();
        req.record(&Principal::new("a"), 10).unwrap();
        req.record(&Principal::new("b"), 5).unwrap();
        assert_eq!(req.severities(), vec![10, 5]);
        assert!(req.has_submitted(&Principal::new("a")));
        assert!(!req.has_submitted(&Principal::new("c")));
    }

    #[test]
    fn duplicate_source_rejected_without_mutation() {
        let mut req = request();
        req.record(&Principal::new("a"), 10).unwrap();
        let err = req.record(&Principal::new("a"), 99).unwrap_err();
        assert!(matches!(err, OracleError::DuplicateSubmission { .. }));
        assert_eq!(req.severities(), vec![10]);
    }

    #[test]
    fn sealed_request_rejects_submissions() {
        let mut req = request();
        req.seal();
        let err = req.record(&Principal::new("a"), 1).unwrap_err();
        assert_eq!(
            err,
            OracleError::AlreadyFinalized {
                request_id: RequestId::new(1)
            }
        );
        assert_eq!(req.submission_count(), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut req = request();
        req.record(&Principal::new("a"), 10).unwrap();
        req.seal();
        req.reset(None);
        assert_eq!(req.state(), RequestState::Open);
        assert_eq!(req.submission_count(), 0);
        assert!(!req.has_submitted(&Principal::new("a")));
        req.record(&Principal::new("a"), 11).unwrap();
    }
}
