//! Error types for oracle operations.
//!
//! Every failure is a synchronous rejection of the call that triggered it.
//! A rejected call never leaves partial state behind, so the caller can
//! inspect the error and decide whether to retry.

use std::fmt;

use thiserror::Error;

use crate::principal::Principal;
use crate::request::RequestId;

/// Errors returned by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The caller lacks the capability required for the action.
    #[error("unauthorized: {principal} may not {action}")]
    Unauthorized {
        /// The principal that attempted the action.
        principal: Principal,
        /// The action that was refused.
        action: &'static str,
    },

    /// A parameter was null or otherwise degenerate.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },

    /// The request has already been finalized.
    #[error("request {request_id} is already finalized")]
    AlreadyFinalized {
        /// The finalized request.
        request_id: RequestId,
    },

    /// The source has already contributed to this request.
    #[error("source {source_id} already submitted to request {request_id}")]
    DuplicateSubmission {
        /// The request that was submitted to.
        request_id: RequestId,
        /// The source that submitted twice.
        source_id: Principal,
    },

    /// Finalization was attempted before enough sources submitted.
    #[error("quorum not met for request {request_id}: {submissions}/{quorum} submissions")]
    QuorumNotMet {
        /// The request being finalized.
        request_id: RequestId,
        /// Submissions collected so far.
        submissions: usize,
        /// Submissions required.
        quorum: u32,
    },

    /// The median was requested over an empty set of values.
    #[error("no values to aggregate")]
    NoValues,

    /// The request identifier has never been opened.
    #[error("request {request_id} has not been opened")]
    UnknownRequest {
        /// The unknown request.
        request_id: RequestId,
    },

    /// The response sink refused the finalized result.
    #[error("response delivery failed for request {request_id}: {reason}")]
    DeliveryFailed {
        /// The request whose result could not be delivered.
        request_id: RequestId,
        /// Reason reported by the sink.
        reason: String,
    },
}

impl OracleError {
    /// Creates a new unauthorized error.
    #[must_use]
    pub fn unauthorized(principal: &Principal, action: &'static str) -> Self {
        Self::Unauthorized {
            principal: principal.clone(),
            action,
        }
    }

    /// Creates a new invalid argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Creates a new delivery failed error.
    #[must_use]
    pub fn delivery_failed(request_id: RequestId, reason: impl Into<String>) -> Self {
        Self::DeliveryFailed {
            request_id,
            reason: reason.into(),
        }
    }

    /// Returns `true` if repeating the same call later may succeed without
    /// any change to the caller's inputs.
    ///
    /// A quorum can still be reached by further submissions, and a sink may
    /// recover from a transient failure. Every other error is permanent for
    /// the given arguments.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::QuorumNotMet { .. } | Self::DeliveryFailed { .. } => true,
            Self::Unauthorized { .. }
            | Self::InvalidArgument { .. }
            | Self::AlreadyFinalized { .. }
            | Self::DuplicateSubmission { .. }
            | Self::NoValues
            | Self::UnknownRequest { .. } => false,
        }
    }

    /// Returns a stable snake_case identifier for the variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::AlreadyFinalized { .. } => "already_finalized",
            Self::DuplicateSubmission { .. } => "duplicate_submission",
            Self::QuorumNotMet { .. } => "quorum_not_met",
            Self::NoValues => "no_values",
            Self::UnknownRequest { .. } => "unknown_request",
            Self::DeliveryFailed { .. } => "delivery_failed",
        }
    }

    /// Returns the error classification for this error.
    #[must_use]
    pub const fn error_class(&self) -> ErrorClass {
        match self {
            Self::Unauthorized { .. } => ErrorClass::Authorization,
            Self::InvalidArgument { .. } | Self::NoValues => ErrorClass::Validation,
            Self::AlreadyFinalized { .. }
            | Self::DuplicateSubmission { .. }
            | Self::QuorumNotMet { .. }
            | Self::UnknownRequest { .. } => ErrorClass::State,
            Self::DeliveryFailed { .. } => ErrorClass::Delivery,
        }
    }
}

/// Error classification for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Capability check failures.
    Authorization,
    /// Rejected parameters.
    Validation,
    /// The request state forbids the operation.
    State,
    /// The response sink failed.
    Delivery,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::State => write!(f, "state"),
            Self::Delivery => write!(f, "delivery"),
        }
    }
}
