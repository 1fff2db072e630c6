//! Top-level wiring.
//!
//! Connects two elastic buffers, the channel B queue and the arbiter:
//!
//! ```text
//! a ──> buf_a ──────────────> arbiter.a ─┐
//!                                         ├──> out
//! b ──> buf_b ──> queue ────> arbiter.b ─┘
//! ```
//!
//! # Evaluation order
//!
//! Each element only reads its own state, so a step is evaluated in two
//! phases. First every signal crossing an element boundary is derived from
//! the pre-step state: buffer outputs and queue head feed the arbiter, the
//! arbiter's grants become buffer A's consumer ready and the queue's read
//! ready, and the queue's write ready becomes buffer B's consumer ready.
//! Then every element commits. No signal loops back on itself, because the
//! valid side never depends on ready.

use crate::{
    arbiter::{Arbiter, ArbiterState},
    beat::{Beat, Channel},
    config::MuxConfig,
    elastic::ElasticBuffer,
    error::ConfigError,
    queue::BeatQueue,
};

/// Signals driven into the multiplexer for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MuxInputs {
    /// Beat offered on channel A
    pub a: Option<Beat>,
    /// Beat offered on channel B
    pub b: Option<Beat>,
    /// Downstream ready on the output port
    pub out_ready: bool,
}

/// Internal state sampled at the start of a step, before anything commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxProbe {
    /// Arbiter state
    pub state: ArbiterState,
    /// Arbiter input A had data
    pub a_valid: bool,
    /// Arbiter input B (queue head) had data
    pub b_valid: bool,
    /// Beat parked in buffer A
    pub a_buffered: bool,
    /// Beat parked in buffer B
    pub b_buffered: bool,
    /// Queue occupancy
    pub queue_len: usize,
}

/// Signals driven by the multiplexer during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxOutputs {
    /// Ready returned to the channel A producer
    pub a_ready: bool,
    /// Ready returned to the channel B producer
    pub b_ready: bool,
    /// Beat presented on the output port
    pub out: Option<Beat>,
    /// Beat transferred on the output port (presented and accepted)
    pub delivered: Option<Beat>,
    /// Channel sourcing the output
    pub grant: Option<Channel>,
    /// Pre-step internal state
    pub probe: MuxProbe,
}

/// Two-input packet multiplexer
#[derive(Debug, Clone)]
pub struct PacketMux {
    config: MuxConfig,
    buf_a: ElasticBuffer<Beat>,
    buf_b: ElasticBuffer<Beat>,
    queue: BeatQueue,
    arbiter: Arbiter,
    cycle: u64,
}

impl PacketMux {
    /// Build a multiplexer with every element empty and the arbiter idle.
    ///
    /// # Errors
    /// Returns `MarginNotBelowCapacity` if the queue configuration is
    /// unusable
    pub fn new(config: MuxConfig) -> Result<Self, ConfigError> {
        let queue = BeatQueue::from_config(&config)?;

        tracing::debug!(
            capacity = config.queue_capacity,
            margin = config.queue_margin,
            "packet mux configured"
        );

        Ok(Self {
            config,
            buf_a: ElasticBuffer::new(),
            buf_b: ElasticBuffer::new(),
            queue,
            arbiter: Arbiter::new(),
            cycle: 0,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Number of steps taken so far, including reset steps.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Current arbiter state.
    pub fn arbiter_state(&self) -> ArbiterState {
        self.arbiter.state()
    }

    /// Current queue occupancy.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Highest queue occupancy since construction or the last reset.
    pub fn queue_high_watermark(&self) -> usize {
        self.queue.high_watermark()
    }

    /// Whether no beat is held anywhere inside the multiplexer.
    pub fn is_drained(&self) -> bool {
        !self.buf_a.is_occupied() && !self.buf_b.is_occupied() && self.queue.is_empty()
    }

    /// Sample internal state without stepping.
    pub fn probe(&self, inputs: &MuxInputs) -> MuxProbe {
        MuxProbe {
            state: self.arbiter.state(),
            a_valid: self.buf_a.output(inputs.a).is_some(),
            b_valid: self.queue.head().is_some(),
            a_buffered: self.buf_a.is_occupied(),
            b_buffered: self.buf_b.is_occupied(),
            queue_len: self.queue.len(),
        }
    }

    /// Advance one clock step.
    pub fn step(&mut self, inputs: MuxInputs) -> MuxOutputs {
        let probe = self.probe(&inputs);

        // Cross-element signals, all from pre-step state
        let a_head = self.buf_a.output(inputs.a);
        let b_head = self.queue.head();
        let queue_write_ready = self.queue.write_ready();

        // Commit
        let arb = self.arbiter.step(a_head, b_head, inputs.out_ready);
        let a_side = self.buf_a.step(inputs.a, arb.a_ready);
        let b_side = self.buf_b.step(inputs.b, queue_write_ready);
        let queue = self.queue.step(b_side.consumer, arb.b_ready);

        debug_assert_eq!(queue.released.is_some(), arb.b_ready && b_head.is_some());

        let delivered = arb.out.filter(|_| inputs.out_ready);
        if let (Some(beat), Some(channel)) = (delivered, arb.grant) {
            tracing::trace!(
                cycle = self.cycle,
                %channel,
                data = beat.data,
                sof = beat.start_of_frame,
                eof = beat.end_of_frame,
                "beat delivered"
            );
        }

        self.cycle += 1;

        MuxOutputs {
            a_ready: a_side.producer_ready,
            b_ready: b_side.producer_ready,
            out: arb.out,
            delivered,
            grant: arb.grant,
            probe,
        }
    }

    /// Synchronous reset: every element returns to its empty / idle state.
    ///
    /// Counts as one step.
    pub fn reset(&mut self) {
        self.buf_a.reset();
        self.buf_b.reset();
        self.queue.reset();
        self.arbiter.reset();
        self.cycle += 1;

        tracing::debug!(cycle = self.cycle, "packet mux reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(a: Option<Beat>, b: Option<Beat>, out_ready: bool) -> MuxInputs {
        MuxInputs { a, b, out_ready }
    }

    #[test]
    fn rejects_bad_config() {
        let result = PacketMux::new(MuxConfig { queue_capacity: 2, queue_margin: 2 });
        assert!(matches!(result, Err(ConfigError::MarginNotBelowCapacity { .. })));
    }

    #[test]
    fn single_beat_on_a_passes_through() {
        let mut mux = PacketMux::new(MuxConfig::default()).unwrap();
        let beat = Beat::single(0x1122_3344_5566_7788).with_end(3);

        let out = mux.step(inputs(Some(beat), None, true));
        assert!(out.a_ready);
        assert_eq!(out.delivered, Some(beat));
        assert_eq!(out.grant, Some(Channel::A));
        assert!(mux.is_drained());
    }

    #[test]
    fn channel_b_goes_through_queue() {
        let mut mux = PacketMux::new(MuxConfig::default()).unwrap();
        let beat = Beat::single(42);

        // Step 0: accepted into buffer B pass-through and queued
        let out = mux.step(inputs(None, Some(beat), true));
        assert!(out.b_ready);
        assert_eq!(out.delivered, None);
        assert_eq!(mux.queue_len(), 1);

        // Step 1: queue head reaches the output
        let out = mux.step(inputs(None, None, true));
        assert_eq!(out.delivered, Some(beat));
        assert_eq!(out.grant, Some(Channel::B));
        assert!(mux.is_drained());
    }

    #[test]
    fn b_frame_in_flight_holds_off_a() {
        let mut mux = PacketMux::new(MuxConfig::default()).unwrap();
        let b0 = Beat::new(0xb0).with_start();
        let b1 = Beat::new(0xb1).with_end(0);
        let a0 = Beat::single(0xa0);

        let out = mux.step(inputs(None, Some(b0), true));
        assert_eq!(out.delivered, None);

        // b0 at queue head, arbiter takes B while b1 is queued
        let out = mux.step(inputs(None, Some(b1), true));
        assert_eq!(out.delivered, Some(b0));
        assert_eq!(mux.arbiter_state(), ArbiterState::Forwarding(Channel::B));

        // A shows up; B frame finishes first
        let out = mux.step(inputs(Some(a0), None, true));
        assert_eq!(out.delivered, Some(b1));
        assert!(out.a_ready, "empty buffer A still accepts and parks the beat");

        let out = mux.step(inputs(None, None, true));
        assert_eq!(out.delivered, Some(a0));
        assert_eq!(out.grant, Some(Channel::A));
    }

    #[test]
    fn reset_clears_everything() {
        let mut mux = PacketMux::new(MuxConfig::default()).unwrap();
        mux.step(inputs(Some(Beat::new(1).with_start()), Some(Beat::single(2)), false));
        assert!(!mux.is_drained());
        assert_eq!(mux.arbiter_state(), ArbiterState::Forwarding(Channel::A));

        mux.reset();
        assert!(mux.is_drained());
        assert_eq!(mux.arbiter_state(), ArbiterState::Idle);
        assert_eq!(mux.cycle(), 2);
    }
}
