//! Scenario testing with mandatory oracles.
//!
//! A scenario describes the traffic offered on each channel, how the
//! sources and sink stall, and the multiplexer configuration. It cannot be
//! run until an oracle is attached: every run ends with a check of the
//! final [`World`].
//!
//! ```text
//! Scenario::new(..)  ── .packet_a/.packet_b/.sink_ready ──> Scenario
//!                    ── .oracle(..) ──────────────────────> RunnableScenario
//!                    ── .run() ───────────────────────────> Result<World, HarnessError>
//! ```

mod builder;
pub mod oracle;
mod world;

pub use builder::{RunnableScenario, Scenario};
pub use world::World;

/// Verification function run against the final world state.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;
