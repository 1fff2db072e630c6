//! Deterministic simulation harness for packet multiplexer testing.
//!
//! Drives [`packet_mux_core::PacketMux`] one clock step at a time with
//! bus-functional sources and a monitoring sink. All randomness (idle gaps,
//! backpressure, payloads) comes from a seeded [`SimEnv`], so every run is
//! reproducible from its seed.
//!
//! # Components
//!
//! - [`packet`]: Packet builder and beat conversion
//! - [`signal`]: Valid/ready activity patterns
//! - [`source`]: Queued source driver for one input channel
//! - [`sink`]: Output monitor that reassembles packets
//! - [`trace`]: Per-step record, CBOR serialisable
//! - [`scenario`]: Scenario builder, world and oracles

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod packet;
pub mod scenario;
pub mod signal;
pub mod sim_env;
pub mod sink;
pub mod source;
pub mod trace;

pub use error::HarnessError;
pub use packet::{Fill, Packet};
pub use signal::{SignalDriver, SignalPattern};
pub use sim_env::SimEnv;
pub use sink::{ReceivedPacket, Sink};
pub use source::Source;
pub use trace::{StepRecord, Trace};

/// Steps of reset applied before a scenario starts driving traffic.
pub const RESET_CYCLES: u32 = 5;

/// Default step budget for a scenario to drain completely.
pub const DEFAULT_MAX_STEPS: u64 = 10_000;
