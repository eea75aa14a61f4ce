//! Pure aggregation functions: median and category classification.
//!
//! These functions hold no state and take no locks. The finalization path in
//! [`crate::oracle`] calls them with the severities collected for a request
//! and the thresholds in force at that moment.
//!
//! All arithmetic is integer arithmetic so every implementation reaches the
//! same result for the same inputs.

mod classify;
mod median;

#[cfg(test)]
mod proptest_median;

pub use classify::{Category, Thresholds, classify};
pub use median::median;
