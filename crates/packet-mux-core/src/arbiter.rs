//! Packet-atomic priority arbiter.
//!
//! Chooses which input drives the output. Priority is only evaluated at
//! frame boundaries; once a multi-beat frame has started, the arbiter stays
//! locked to its channel until that frame's last beat is accepted.
//!
//! # State Machine
//!
//! ```text
//!                 A valid, sof && !eof
//!          ┌───────────────────────────────┐
//!          │                               v
//!       ┌──────┐  accepted eof from A  ┌─────────────────┐
//!       │ Idle │<──────────────────────│ Forwarding(A)   │
//!       └──────┘                       └─────────────────┘
//!          │  ^
//!          │  │ accepted eof from B    ┌─────────────────┐
//!          │  └────────────────────────│ Forwarding(B)   │
//!          │                           └─────────────────┘
//!          │   !A valid, B valid,              ^
//!          └───── sof && !eof ─────────────────┘
//! ```
//!
//! In `Idle`, A wins whenever it has data. One-beat frames never leave
//! `Idle`. All outputs are combinational in the current state and inputs:
//! the granted channel's ready follows the output ready, the other channel's
//! ready is held low.

use serde::{Deserialize, Serialize};

use crate::beat::{Beat, Channel};

/// Arbiter state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArbiterState {
    /// Between frames; the next selection is made by priority
    #[default]
    Idle,
    /// Locked to a channel until its in-flight frame ends
    Forwarding(Channel),
}

impl ArbiterState {
    /// Channel the arbiter is locked to, if any.
    pub fn locked_to(self) -> Option<Channel> {
        match self {
            Self::Idle => None,
            Self::Forwarding(channel) => Some(channel),
        }
    }
}

/// Signals driven by the arbiter during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArbiterOutputs {
    /// Channel sourcing the output this step
    pub grant: Option<Channel>,
    /// Ready returned to channel A
    pub a_ready: bool,
    /// Ready returned to channel B
    pub b_ready: bool,
    /// Beat presented on the output
    pub out: Option<Beat>,
}

/// Two-input priority arbiter
#[derive(Debug, Clone, Default)]
pub struct Arbiter {
    state: ArbiterState,
}

impl Arbiter {
    /// Create an arbiter in `Idle`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> ArbiterState {
        self.state
    }

    /// Synchronous reset back to `Idle`.
    pub fn reset(&mut self) {
        self.state = ArbiterState::Idle;
    }

    /// Channel that sources the output this step.
    ///
    /// A locked arbiter keeps its channel even while that channel has no
    /// data; the other channel is never granted mid-frame.
    pub fn select(&self, a: Option<Beat>, b: Option<Beat>) -> Option<Channel> {
        match self.state {
            ArbiterState::Forwarding(channel) => Some(channel),
            ArbiterState::Idle if a.is_some() => Some(Channel::A),
            ArbiterState::Idle if b.is_some() => Some(Channel::B),
            ArbiterState::Idle => None,
        }
    }

    /// Combinational outputs for the current state and inputs.
    pub fn evaluate(&self, a: Option<Beat>, b: Option<Beat>, out_ready: bool) -> ArbiterOutputs {
        let grant = self.select(a, b);
        let out = match grant {
            Some(Channel::A) => a,
            Some(Channel::B) => b,
            None => None,
        };

        ArbiterOutputs {
            grant,
            a_ready: grant == Some(Channel::A) && out_ready,
            b_ready: grant == Some(Channel::B) && out_ready,
            out,
        }
    }

    /// State after a step with the given outputs.
    pub fn next_state(&self, outputs: &ArbiterOutputs, out_ready: bool) -> ArbiterState {
        match (self.state, outputs.grant, outputs.out) {
            (ArbiterState::Idle, Some(channel), Some(beat)) if beat.opens_multi_beat_frame() => {
                ArbiterState::Forwarding(channel)
            },
            (ArbiterState::Forwarding(_), _, Some(beat)) if out_ready && beat.end_of_frame => {
                ArbiterState::Idle
            },
            (state, ..) => state,
        }
    }

    /// Advance one clock step.
    pub fn step(&mut self, a: Option<Beat>, b: Option<Beat>, out_ready: bool) -> ArbiterOutputs {
        let outputs = self.evaluate(a, b, out_ready);
        let next = self.next_state(&outputs, out_ready);

        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, "arbiter transition");
            self.state = next;
        }

        outputs
    }
}
