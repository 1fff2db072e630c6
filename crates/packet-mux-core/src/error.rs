//! Configuration error types.
//!
//! The multiplexer has no runtime error states. The only failure it can
//! report is a configuration that cannot satisfy the queue's backpressure
//! contract, and that is rejected before any element is built.

use thiserror::Error;

/// Errors raised while validating a [`crate::MuxConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The queue would stop admitting beats at or below zero occupancy.
    #[error("queue capacity {capacity} must be strictly greater than reaction margin {margin}")]
    MarginNotBelowCapacity {
        /// Configured queue capacity
        capacity: usize,
        /// Configured reaction margin
        margin: usize,
    },
}
