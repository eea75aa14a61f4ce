//! The oracle: request lifecycle, submissions, finalization and
//! administration behind one thread-safe handle.
//!
//! # Concurrency
//!
//! Each request lives behind its own `Mutex`, so submissions and
//! finalization for the same identifier are serialized while different
//! identifiers proceed in parallel. Settings and access control sit behind
//! `RwLock`s and are copied out whole, so a reader never observes a
//! half-updated threshold pair.
//!
//! Locks are always taken in the order registry, request map, request. The
//! access-control and settings locks are leaves: nothing else is acquired
//! while they are held, except the settings lock under the access lock in
//! admin calls.
//!
//! Observers run while the request lock is held, so events for one request
//! reach observers in commit order. An observer must not call back into the
//! oracle for the same request.
//!
//! # Finalization
//!
//! Finalization is open to any caller. Under the request lock it checks the
//! state and the quorum, computes the median and category, delivers the
//! payload to the [`ResponseSink`], and only then seals the request. A sink
//! failure leaves the request open. Concurrent callers racing on the same
//! request see exactly one success; the rest get
//! [`OracleError::AlreadyFinalized`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::access::AccessControl;
use crate::aggregate::{Category, Thresholds, classify, median};
use crate::error::OracleError;
use crate::events::{EventObserver, OracleEvent};
use crate::principal::Principal;
use crate::registry::RequestRegistry;
use crate::request::{AggregationRequest, RequestId, RequestState, Severity, Submission};
use crate::settings::{AggregationSettings, SettingsMode};
use crate::sink::{ResponsePayload, ResponseSink};

/// Outcome of a successful finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finalization {
    /// The finalized request.
    pub request_id: RequestId,
    /// Median of the submitted severities.
    pub median: Severity,
    /// Category delivered to the sink.
    pub category: Category,
    /// Number of submissions aggregated.
    pub submission_count: usize,
}

type RequestSlot = Arc<Mutex<AggregationRequest>>;

/// Thread-safe severity oracle.
pub struct Oracle {
    access: RwLock<AccessControl>,
    settings: RwLock<AggregationSettings>,
    registry: Mutex<RequestRegistry>,
    requests: RwLock<HashMap<RequestId, RequestSlot>>,
    sink: Arc<dyn ResponseSink>,
    observers: Vec<Arc<dyn EventObserver>>,
}

impl std::fmt::Debug for Oracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oracle")
            .field("admin", &self.admin())
            .field("settings", &self.settings())
            .field("total_requests", &self.total_requests())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Oracle {
    /// Creates an oracle administered by `deployer`, who is also authorized
    /// as a source.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::InvalidArgument` if `deployer` is null.
    pub fn new(
        deployer: Principal,
        settings: AggregationSettings,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<Self, OracleError> {
        let access = AccessControl::new(deployer)?;
        Ok(Self {
            access: RwLock::new(access),
            settings: RwLock::new(settings),
            registry: Mutex::new(RequestRegistry::new()),
            requests: RwLock::new(HashMap::new()),
            sink,
            observers: Vec::new(),
        })
    }

    /// Adds an event observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn EventObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    // ------------------------------------------------------------------
    // Request lifecycle
    // ------------------------------------------------------------------

    /// Opens `request_id` for `subject`, or resets it if it already exists.
    ///
    /// Any submissions and any finalized state held under `request_id` are
    /// discarded. The subject now points at `request_id`, and the opened
    /// counter grows by one. The host must keep identifiers unique per
    /// logical event; re-opening a live request clobbers its submissions.
    pub fn open(&self, request_id: RequestId, subject: &str) {
        let settings = *read(&self.settings);
        let pinned = match settings.mode() {
            SettingsMode::Live => None,
            SettingsMode::Snapshot => Some(settings.rules()),
        };

        let mut registry = lock(&self.registry);
        let slot = {
            let mut requests = write(&self.requests);
            let slot = requests.entry(request_id).or_insert_with(|| {
                Arc::new(Mutex::new(AggregationRequest::new(request_id, pinned)))
            });
            Arc::clone(slot)
        };

        let mut request = lock(&slot);
        let discarded = request.submission_count();
        let was_finalized = request.is_finalized();
        request.reset(pinned);
        let previous = registry.record_open(request_id, subject);
        drop(registry);

        tracing::debug!(
            %request_id,
            subject,
            discarded,
            was_finalized,
            previous_request = ?previous,
            "request opened"
        );
        self.emit(&OracleEvent::RequestOpened {
            request_id,
            subject: subject.to_owned(),
        });
    }

    /// Accepts and ignores a cancellation for `request_id`.
    ///
    /// Cancellation has no effect: later submissions and finalization for
    /// the request behave exactly as if it had never been called.
    pub fn cancel(&self, request_id: RequestId) {
        tracing::debug!(%request_id, "cancel requested; ignored");
    }

    /// Records `severity` from `source` for `request_id`.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if `source` is not an authorized source
    /// - `InvalidArgument` if a severity bound is set and exceeded
    /// - `UnknownRequest` if `request_id` was never opened
    /// - `AlreadyFinalized` if the request is sealed
    /// - `DuplicateSubmission` if `source` already submitted
    pub fn submit(
        &self,
        request_id: RequestId,
        source: &Principal,
        severity: Severity,
    ) -> Result<(), OracleError> {
        read(&self.access)
            .require_source(source)
            .inspect_err(|e| {
                tracing::warn!(%request_id, %source, error = %e, "submission refused");
            })?;
        read(&self.settings).check_severity(severity)?;

        let slot = self.slot(request_id)?;
        let mut request = lock(&slot);
        request.record(source, severity)?;
        let count = request.submission_count();

        tracing::debug!(%request_id, %source, severity, count, "severity accepted");
        self.emit(&OracleEvent::SeveritySubmitted {
            request_id,
            source: source.clone(),
            severity,
        });
        Ok(())
    }

    /// Finalizes `request_id` and delivers its category to the sink.
    ///
    /// # Errors
    ///
    /// - `UnknownRequest` if `request_id` was never opened
    /// - `AlreadyFinalized` if the request is sealed
    /// - `QuorumNotMet` if fewer submissions than the quorum were collected
    /// - `DeliveryFailed` if the sink refused the payload; the request stays
    ///   open
    pub fn finalize(&self, request_id: RequestId) -> Result<Finalization, OracleError> {
        let slot = self.slot(request_id)?;
        let mut request = lock(&slot);

        if request.is_finalized() {
            return Err(OracleError::AlreadyFinalized { request_id });
        }

        let rules = request
            .pinned_rules()
            .unwrap_or_else(|| read(&self.settings).rules());

        let submission_count = request.submission_count();
        if submission_count < usize::try_from(rules.quorum).unwrap_or(usize::MAX) {
            return Err(OracleError::QuorumNotMet {
                request_id,
                submissions: submission_count,
                quorum: rules.quorum,
            });
        }

        let median = median(&request.severities())?;
        let category = classify(median, rules.thresholds);

        self.sink
            .deliver(ResponsePayload {
                request_id,
                category,
            })
            .map_err(|e| {
                tracing::warn!(%request_id, error = %e, "response delivery failed");
                OracleError::delivery_failed(request_id, e.to_string())
            })?;
        request.seal();

        tracing::info!(%request_id, median, %category, submission_count, "request finalized");
        self.emit(&OracleEvent::RequestFinalized {
            request_id,
            median,
            category,
            submission_count,
        });

        Ok(Finalization {
            request_id,
            median,
            category,
            submission_count,
        })
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Replaces the administrator.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `caller` is the administrator;
    /// `InvalidArgument` if `new_admin` is null.
    pub fn set_admin(&self, caller: &Principal, new_admin: Principal) -> Result<(), OracleError> {
        let mut access = write(&self.access);
        let previous = access.admin().clone();
        access
            .set_admin(caller, new_admin.clone())
            .inspect_err(|e| tracing::warn!(%caller, error = %e, "set_admin refused"))?;
        drop(access);

        tracing::info!(%previous, current = %new_admin, "admin changed");
        self.emit(&OracleEvent::AdminChanged {
            previous,
            current: new_admin,
        });
        Ok(())
    }

    /// Grants or revokes submission rights.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `caller` is the administrator;
    /// `InvalidArgument` if `source` is null.
    pub fn set_source(
        &self,
        caller: &Principal,
        source: Principal,
        allowed: bool,
    ) -> Result<(), OracleError> {
        let changed = write(&self.access)
            .set_source(caller, source.clone(), allowed)
            .inspect_err(|e| tracing::warn!(%caller, error = %e, "set_source refused"))?;

        tracing::info!(%source, allowed, changed, "source membership set");
        self.emit(&OracleEvent::SourceUpdated { source, allowed });
        Ok(())
    }

    /// Sets the quorum. Applies to every request not yet finalized unless
    /// the oracle runs in snapshot mode.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `caller` is the administrator;
    /// `InvalidArgument` if `quorum` is zero.
    pub fn set_quorum(&self, caller: &Principal, quorum: u32) -> Result<(), OracleError> {
        self.update_settings(caller, "set quorum", |s| s.set_quorum(quorum))
    }

    /// Sets both classification thresholds at once.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `caller` is the administrator;
    /// `InvalidArgument` unless `medium < large`.
    pub fn set_thresholds(
        &self,
        caller: &Principal,
        medium: Severity,
        large: Severity,
    ) -> Result<(), OracleError> {
        self.update_settings(caller, "set thresholds", |s| {
            s.set_thresholds(Thresholds::new(medium, large)?);
            Ok(())
        })
    }

    /// Enables (`Some`) or disables (`None`) the severity upper bound.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `caller` is the administrator.
    pub fn set_severity_bound(
        &self,
        caller: &Principal,
        bound: Option<Severity>,
    ) -> Result<(), OracleError> {
        self.update_settings(caller, "set severity bound", |s| {
            s.set_severity_bound(bound);
            Ok(())
        })
    }

    fn update_settings(
        &self,
        caller: &Principal,
        action: &'static str,
        apply: impl FnOnce(&mut AggregationSettings) -> Result<(), OracleError>,
    ) -> Result<(), OracleError> {
        let access = read(&self.access);
        access
            .require_admin(caller, action)
            .inspect_err(|e| tracing::warn!(%caller, error = %e, "settings change refused"))?;

        let mut settings = write(&self.settings);
        let mut updated = *settings;
        apply(&mut updated)?;
        *settings = updated;
        drop(settings);
        drop(access);

        tracing::info!(
            action,
            quorum = updated.quorum(),
            medium = updated.thresholds().medium(),
            large = updated.thresholds().large(),
            "settings updated"
        );
        self.emit(&OracleEvent::SettingsUpdated {
            quorum: updated.quorum(),
            medium_threshold: updated.thresholds().medium(),
            large_threshold: updated.thresholds().large(),
            severity_bound: updated.severity_bound(),
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The most recently opened request for `subject`.
    #[must_use]
    pub fn request_for_subject(&self, subject: &str) -> Option<RequestId> {
        lock(&self.registry).request_for(subject)
    }

    /// Total number of opens, including re-opens of the same identifier.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        lock(&self.registry).total_opened()
    }

    /// Submissions collected for `request_id`; zero if never opened.
    #[must_use]
    pub fn submission_count(&self, request_id: RequestId) -> usize {
        self.with_request(request_id, AggregationRequest::submission_count)
            .unwrap_or(0)
    }

    /// Whether `request_id` is finalized; `false` if never opened.
    #[must_use]
    pub fn is_finalized(&self, request_id: RequestId) -> bool {
        self.with_request(request_id, AggregationRequest::is_finalized)
            .unwrap_or(false)
    }

    /// Lifecycle state of `request_id`, if it was ever opened.
    #[must_use]
    pub fn request_state(&self, request_id: RequestId) -> Option<RequestState> {
        self.with_request(request_id, AggregationRequest::state)
    }

    /// Accepted submissions for `request_id` in arrival order.
    #[must_use]
    pub fn submissions(&self, request_id: RequestId) -> Vec<Submission> {
        self.with_request(request_id, |r| r.submissions().to_vec())
            .unwrap_or_default()
    }

    /// The current administrator.
    #[must_use]
    pub fn admin(&self) -> Principal {
        read(&self.access).admin().clone()
    }

    /// Whether `principal` is the administrator.
    #[must_use]
    pub fn is_admin(&self, principal: &Principal) -> bool {
        read(&self.access).is_admin(principal)
    }

    /// Whether `principal` may submit.
    #[must_use]
    pub fn is_source(&self, principal: &Principal) -> bool {
        read(&self.access).is_source(principal)
    }

    /// All authorized sources in identity order.
    #[must_use]
    pub fn sources(&self) -> Vec<Principal> {
        read(&self.access).sources().cloned().collect()
    }

    /// A consistent copy of the current settings.
    #[must_use]
    pub fn settings(&self) -> AggregationSettings {
        *read(&self.settings)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn slot(&self, request_id: RequestId) -> Result<RequestSlot, OracleError> {
        read(&self.requests)
            .get(&request_id)
            .cloned()
            .ok_or(OracleError::UnknownRequest { request_id })
    }

    fn with_request<T>(
        &self,
        request_id: RequestId,
        f: impl FnOnce(&AggregationRequest) -> T,
    ) -> Option<T> {
        let slot = self.slot(request_id).ok()?;
        let request = lock(&slot);
        Some(f(&request))
    }

    fn emit(&self, event: &OracleEvent) {
        for observer in &self.observers {
            observer.observe(event);
        }
    }
}

// No call leaves guarded state half-written, so a poisoned lock still holds a
// consistent value.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}
