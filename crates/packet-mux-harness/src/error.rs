//! Harness error types.

use packet_mux_core::ConfigError;
use thiserror::Error;

/// Errors raised while building or running a simulation.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Multiplexer configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Requested packet length outside the Ethernet frame range
    #[error("packet of {len} bytes outside {min}..={max}")]
    PacketSize {
        /// Requested length in bytes
        len: usize,
        /// Smallest allowed length
        min: usize,
        /// Largest allowed length
        max: usize,
    },

    /// Traffic still pending when the step budget ran out
    #[error("simulation did not drain within {steps} steps ({backlog} beats outstanding)")]
    Stalled {
        /// Steps executed
        steps: u64,
        /// Beats still held by sources or inside the multiplexer
        backlog: usize,
    },

    /// An oracle rejected the final world state
    #[error("scenario '{scenario}' failed oracle: {reason}")]
    Oracle {
        /// Scenario name
        scenario: String,
        /// Oracle failure message
        reason: String,
    },

    /// Trace could not be written
    #[error("trace encoding failed: {0}")]
    TraceEncode(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Trace could not be read
    #[error("trace decoding failed: {0}")]
    TraceDecode(#[source] Box<dyn std::error::Error + Send + Sync>),
}
