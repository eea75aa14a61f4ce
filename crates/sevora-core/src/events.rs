//! Notifications emitted by the oracle.
//!
//! Events are informational: they are produced after a state change has been
//! committed and observers cannot veto or alter it. Where the events go
//! (a log, a ledger, a message bus) is up to the observer.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::aggregate::Category;
use crate::principal::Principal;
use crate::request::{RequestId, Severity};

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OracleEvent {
    /// A request was opened or re-opened.
    RequestOpened {
        /// The opened request.
        request_id: RequestId,
        /// The subject it concerns.
        subject: String,
    },
    /// A source's severity was accepted.
    SeveritySubmitted {
        /// The request submitted to.
        request_id: RequestId,
        /// The submitting source.
        source: Principal,
        /// The reported severity.
        severity: Severity,
    },
    /// A request was finalized and its response delivered.
    RequestFinalized {
        /// The finalized request.
        request_id: RequestId,
        /// Median of the submitted severities.
        median: Severity,
        /// Resulting category.
        category: Category,
        /// Number of submissions aggregated.
        submission_count: usize,
    },
    /// The administrator was replaced.
    AdminChanged {
        /// Previous administrator.
        previous: Principal,
        /// New administrator.
        current: Principal,
    },
    /// A source was granted or lost submission rights.
    SourceUpdated {
        /// The affected source.
        source: Principal,
        /// Whether it may now submit.
        allowed: bool,
    },
    /// Quorum, thresholds or severity bound changed.
    SettingsUpdated {
        /// Quorum now in force.
        quorum: u32,
        /// Medium threshold now in force.
        medium_threshold: Severity,
        /// Large threshold now in force.
        large_threshold: Severity,
        /// Severity bound now in force.
        severity_bound: Option<Severity>,
    },
}

impl OracleEvent {
    /// Returns the event type as a string identifier.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RequestOpened { .. } => "request_opened",
            Self::SeveritySubmitted { .. } => "severity_submitted",
            Self::RequestFinalized { .. } => "request_finalized",
            Self::AdminChanged { .. } => "admin_changed",
            Self::SourceUpdated { .. } => "source_updated",
            Self::SettingsUpdated { .. } => "settings_updated",
        }
    }
}

/// Receives oracle events.
pub trait EventObserver: Send + Sync {
    /// Handles one event. Must not block for long; it runs on the caller's
    /// thread after the state change is committed.
    fn observe(&self, event: &OracleEvent);
}

/// Forwards events to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl EventObserver for TracingObserver {
    fn observe(&self, event: &OracleEvent) {
        match event {
            OracleEvent::RequestOpened {
                request_id,
                subject,
            } => tracing::info!(%request_id, subject = %subject, "request opened"),
            OracleEvent::SeveritySubmitted {
                request_id,
                source,
                severity,
            } => tracing::info!(%request_id, %source, severity, "severity submitted"),
            OracleEvent::RequestFinalized {
                request_id,
                median,
                category,
                submission_count,
            } => tracing::info!(
                %request_id,
                median,
                %category,
                submission_count,
                "request finalized"
            ),
            OracleEvent::AdminChanged { previous, current } => {
                tracing::info!(%previous, %current, "admin changed");
            },
            OracleEvent::SourceUpdated { source, allowed } => {
                tracing::info!(%source, allowed, "source updated");
            },
            OracleEvent::SettingsUpdated {
                quorum,
                medium_threshold,
                large_threshold,
                severity_bound,
            } => tracing::info!(
                quorum,
                medium_threshold,
                large_threshold,
                severity_bound = ?severity_bound,
                "settings updated"
            ),
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<OracleEvent>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events seen so far.
    #[must_use]
    pub fn events(&self) -> Vec<OracleEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns the events seen so far.
    pub fn drain(&self) -> Vec<OracleEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventObserver for RecordingObserver {
    fn observe(&self, event: &OracleEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_keeps_order() {
        let rec = RecordingObserver::new();
        rec.observe(&OracleEvent::RequestOpened {
            request_id: RequestId::new(1),
            subject: "lisbon".into(),
        });
        rec.observe(&OracleEvent::SourceUpdated {
            source: Principal::new("a"),
            allowed: true,
        });
        let kinds: Vec<_> = rec.events().iter().map(OracleEvent::kind).collect();
        assert_eq!(kinds, vec!["request_opened", "source_updated"]);
        assert_eq!(rec.drain().len(), 2);
        assert!(rec.events().is_empty());
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = OracleEvent::RequestFinalized {
            request_id: RequestId::new(4),
            median: 30,
            category: Category::Medium,
            submission_count: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "request_finalized");
        assert_eq!(json["request_id"], 4);
        assert_eq!(json["category"], "M");
    }
}
