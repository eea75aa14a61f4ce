//! One-shot delivery of finalized results.
//!
//! The oracle does not know how a result reaches the party that opened the
//! request. It calls [`ResponseSink::deliver`] exactly once per successful
//! finalization and treats an `Err` as "not delivered", leaving the request
//! open so finalization can be retried.

use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::Category;
use crate::request::RequestId;

/// The result handed to the response consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// The finalized request.
    pub request_id: RequestId,
    /// Its category.
    pub category: Category,
}

impl ResponsePayload {
    /// Wire form of the payload: the single category byte.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 1] {
        [self.category.code()]
    }
}

/// Reasons a sink can refuse a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The consumer is gone.
    #[error("response consumer disconnected")]
    Disconnected,

    /// The consumer rejected the payload.
    #[error("response rejected: {0}")]
    Rejected(String),
}

/// Destination for finalized results.
pub trait ResponseSink: Send + Sync {
    /// Delivers one finalized result.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the result was not accepted.
    fn deliver(&self, payload: ResponsePayload) -> Result<(), SinkError>;
}

/// Keeps every delivered payload in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<ResponsePayload>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the payloads delivered so far.
    #[must_use]
    pub fn delivered(&self) -> Vec<ResponsePayload> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of deliveries for `request_id`.
    #[must_use]
    pub fn deliveries_for(&self, request_id: RequestId) -> usize {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| p.request_id == request_id)
            .count()
    }
}

impl ResponseSink for RecordingSink {
    fn deliver(&self, payload: ResponsePayload) -> Result<(), SinkError> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload);
        Ok(())
    }
}

/// Forwards payloads over a standard channel.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Sender<ResponsePayload>,
}

impl ChannelSink {
    /// Creates a sink that sends on `tx`.
    #[must_use]
    pub const fn new(tx: Sender<ResponsePayload>) -> Self {
        Self { tx }
    }
}

impl ResponseSink for ChannelSink {
    fn deliver(&self, payload: ResponsePayload) -> Result<(), SinkError> {
        self.tx.send(payload).map_err(|_| SinkError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    fn payload(id: u64, category: Category) -> ResponsePayload {
        ResponsePayload {
            request_id: RequestId::new(id),
            category,
        }
    }

    #[test]
    fn wire_form_is_one_byte() {
        assert_eq!(payload(1, Category::Small).to_bytes(), *b"S");
        assert_eq!(payload(1, Category::Large).to_bytes(), *b"L");
    }

    #[test]
    fn recording_sink_counts_per_request() {
        let sink = RecordingSink::new();
        sink.deliver(payload(1, Category::Small)).unwrap();
        sink.deliver(payload(2, Category::Medium)).unwrap();
        assert_eq!(sink.deliveries_for(RequestId::new(1)), 1);
        assert_eq!(sink.deliveries_for(RequestId::new(3)), 0);
        assert_eq!(sink.delivered().len(), 2);
    }

    #[test]
    fn channel_sink_reports_disconnect() {
        let (tx, rx) = mpsc::channel();
        let sink = ChannelSink::new(tx);
        sink.deliver(payload(1, Category::Medium)).unwrap();
        assert_eq!(rx.recv().unwrap(), payload(1, Category::Medium));
        drop(rx);
        assert_eq!(
            sink.deliver(payload(2, Category::Medium)),
            Err(SinkError::Disconnected)
        );
    }
}
