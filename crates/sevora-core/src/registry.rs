//! Subject-to-request index.
//!
//! Opening a request for a subject overwrites whatever request the subject
//! pointed at before (last write wins). Entries are never removed, and the
//! opened counter only grows, including when an identifier is reused.

use std::collections::HashMap;

use crate::request::RequestId;

/// Maps subject names to the most recently opened request.
#[derive(Debug, Clone, Default)]
pub struct RequestRegistry {
    by_subject: HashMap<String, RequestId>,
    total_opened: u64,
}

impl RequestRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `request_id` was opened for `subject`.
    ///
    /// Returns the request the subject pointed at before, if any.
    pub fn record_open(&mut self, request_id: RequestId, subject: &str) -> Option<RequestId> {
        self.total_opened = self.total_opened.saturating_add(1);
        self.by_subject.insert(subject.to_owned(), request_id)
    }

    /// The most recently opened request for `subject`.
    #[must_use]
    pub fn request_for(&self, subject: &str) -> Option<RequestId> {
        self.by_subject.get(subject).copied()
    }

    /// Total number of opens ever recorded.
    #[must_use]
    pub const fn total_opened(&self) -> u64 {
        self.total_opened
    }

    /// Number of distinct subjects seen.
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.by_subject.len()
    }
}
