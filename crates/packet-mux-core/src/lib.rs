//! Packet multiplexer core logic
//!
//! Merges two independently paced beat streams into one output stream. Channel
//! A has strict priority over channel B at frame boundaries, and a frame that
//! has started is never interleaved with beats from the other channel.
//!
//! # Architecture
//!
//! Every element is a clocked state machine with no I/O. One call to `step`
//! is one clock tick: outputs are computed from the current state and the
//! inputs supplied for this tick, then the new state is committed. Nothing
//! observes another element's updated state within the same tick except
//! through the signals passed explicitly between them.
//!
//! ```text
//! A ──> ElasticBuffer(A) ─────────────────┐
//!                                         ├──> Arbiter ──> out
//! B ──> ElasticBuffer(B) ──> BeatQueue ───┘
//! ```
//!
//! The only external backpressure input is the output `ready` signal.
//!
//! # Components
//!
//! - [`beat`]: Beat and channel types
//! - [`elastic`]: Single-slot elastic (skid) buffer
//! - [`queue`]: Bounded FIFO with an almost-full threshold
//! - [`arbiter`]: Packet-atomic priority arbiter
//! - [`mux`]: Top-level wiring of the above
//! - [`config`]: Configuration constants and validation
//! - [`error`]: Configuration error types

pub mod arbiter;
pub mod beat;
pub mod config;
pub mod elastic;
pub mod error;
pub mod mux;
pub mod queue;

pub use arbiter::{Arbiter, ArbiterOutputs, ArbiterState};
pub use beat::{Beat, Channel};
pub use config::MuxConfig;
pub use elastic::{ElasticBuffer, ElasticOutputs};
pub use error::ConfigError;
pub use mux::{MuxInputs, MuxOutputs, MuxProbe, PacketMux};
pub use queue::{BeatQueue, QueueOutputs};
