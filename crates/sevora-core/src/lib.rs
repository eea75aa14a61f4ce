//! # sevora-core
//!
//! Decision core of a severity oracle. Independent sources report how severe
//! a named real-world event is; once a quorum of distinct sources has
//! reported, the oracle takes the exact integer median of the reports,
//! classifies it against two thresholds into `S`, `M` or `L`, and delivers
//! that category to the party that opened the request, exactly once.
//!
//! ## Core Concepts
//!
//! - **Request**: one aggregation, identified by a host-assigned
//!   [`RequestId`] and tied to a subject name. Opening an existing
//!   identifier resets it.
//! - **Source**: a [`Principal`] on the allow-list, entitled to one severity
//!   per request.
//! - **Quorum**: the number of distinct submissions required before
//!   [`Oracle::finalize`] succeeds.
//! - **Category**: the [`Category`] derived from the median.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sevora_core::{
//!     AggregationSettings, Category, Oracle, Principal, RecordingSink, RequestId, Thresholds,
//! };
//!
//! # fn main() -> Result<(), sevora_core::OracleError> {
//! let ops = Principal::new("ops");
//! let sink = Arc::new(RecordingSink::new());
//! let settings = AggregationSettings::new(2, Thresholds::new(20, 100)?)?;
//! let oracle = Oracle::new(ops.clone(), settings, sink.clone())?;
//! oracle.set_source(&ops, Principal::new("station-a"), true)?;
//!
//! let id = RequestId::new(1);
//! oracle.open(id, "lisbon");
//! oracle.submit(id, &ops, 10)?;
//! oracle.submit(id, &Principal::new("station-a"), 50)?;
//!
//! let result = oracle.finalize(id)?;
//! assert_eq!(result.median, 30);
//! assert_eq!(result.category, Category::Medium);
//! assert_eq!(sink.delivered().len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod access;
pub mod aggregate;
pub mod config;
pub mod error;
pub mod events;
pub mod oracle;
pub mod principal;
pub mod registry;
pub mod request;
pub mod settings;
pub mod sink;

// Re-export main types at crate root for convenience
pub use access::AccessControl;
pub use aggregate::{Category, Thresholds, classify, median};
pub use config::{ConfigError, OracleConfig};
pub use error::{ErrorClass, OracleError};
pub use events::{EventObserver, OracleEvent, RecordingObserver, TracingObserver};
pub use oracle::{Finalization, Oracle};
pub use principal::Principal;
pub use registry::RequestRegistry;
pub use request::{AggregationRequest, RequestId, RequestState, Severity, Submission};
pub use settings::{AggregationSettings, DecisionRules, SettingsMode};
pub use sink::{ChannelSink, RecordingSink, ResponsePayload, ResponseSink, SinkError};
