//! Fuzz target for the multiplexer handshake.
//!
//! Drives `PacketMux` with arbitrary offers, framing flags and output
//! backpressure. Producers follow the handshake rules (a presented beat is
//! held until accepted); everything else is up to the fuzzer, including
//! malformed framing. Checks after every step:
//! - per-channel output is a prefix of what that channel handed over
//! - the queue never reaches its capacity
//! - a multi-beat frame is never interleaved with the other channel
//! - A wins every contested idle step

#![no_main]

use libfuzzer_sys::fuzz_target;
use packet_mux_core::{ArbiterState, Beat, Channel, MuxConfig, MuxInputs, PacketMux, config::EMPTY_MASK};

#[derive(Debug, arbitrary::Arbitrary)]
struct FuzzBeat {
    data: u64,
    start_of_frame: bool,
    end_of_frame: bool,
    empty: u8,
    error: bool,
}

impl FuzzBeat {
    fn to_beat(&self) -> Beat {
        Beat {
            data: self.data,
            start_of_frame: self.start_of_frame,
            end_of_frame: self.end_of_frame,
            empty: self.empty & EMPTY_MASK,
            error: self.error,
        }
    }
}

#[derive(Debug, arbitrary::Arbitrary)]
struct FuzzStep {
    a: Option<FuzzBeat>,
    b: Option<FuzzBeat>,
    out_ready: bool,
}

#[derive(Debug, arbitrary::Arbitrary)]
struct FuzzInput {
    capacity: u8,
    margin: u8,
    steps: Vec<FuzzStep>,
}

#[derive(Default)]
struct Port {
    held: Option<Beat>,
    handed_over: Vec<Beat>,
    delivered: Vec<Beat>,
}

impl Port {
    fn offer(&mut self, next: Option<&FuzzBeat>) -> Option<Beat> {
        if self.held.is_none() {
            self.held = next.map(FuzzBeat::to_beat);
        }
        self.held
    }

    fn complete(&mut self, ready: bool) {
        if ready {
            if let Some(beat) = self.held.take() {
                self.handed_over.push(beat);
            }
        }
    }

    fn check_prefix(&self) {
        assert!(self.delivered.len() <= self.handed_over.len());
        assert_eq!(self.delivered[..], self.handed_over[..self.delivered.len()]);
    }
}

struct Checker {
    mux: PacketMux,
    a: Port,
    b: Port,
    open: Option<Channel>,
}

impl Checker {
    fn step(&mut self, next_a: Option<&FuzzBeat>, next_b: Option<&FuzzBeat>, out_ready: bool) {
        let inputs = MuxInputs { a: self.a.offer(next_a), b: self.b.offer(next_b), out_ready };
        let out = self.mux.step(inputs);

        self.a.complete(out.a_ready);
        self.b.complete(out.b_ready);

        if out.probe.state == ArbiterState::Idle && out.probe.a_valid {
            assert_eq!(out.grant, Some(Channel::A));
        }
        assert!(self.mux.queue_len() < self.mux.config().queue_capacity);
        assert!(self.mux.queue_len() <= self.mux.config().almost_full_threshold());

        if let (Some(beat), Some(channel)) = (out.delivered, out.grant) {
            if let Some(owner) = self.open {
                assert_eq!(owner, channel, "frame interleaved");
            }
            if beat.opens_multi_beat_frame() {
                self.open = Some(channel);
            }
            if beat.end_of_frame {
                self.open = None;
            }
            match channel {
                Channel::A => self.a.delivered.push(beat),
                Channel::B => self.b.delivered.push(beat),
            }
        }

        self.a.check_prefix();
        self.b.check_prefix();
    }
}

fuzz_target!(|input: FuzzInput| {
    let capacity = usize::from(input.capacity % 32) + 2;
    let margin = usize::from(input.margin) % (capacity - 1) + 1;
    let Ok(mux) = PacketMux::new(MuxConfig { queue_capacity: capacity, queue_margin: margin }) else {
        return;
    };

    let mut checker = Checker { mux, a: Port::default(), b: Port::default(), open: None };

    for step in &input.steps {
        checker.step(step.a.as_ref(), step.b.as_ref(), step.out_ready);
    }

    // Drain: no new offers, output always ready
    for _ in 0..capacity + 8 {
        checker.step(None, None, true);
    }

    // A frame left open by its producer keeps the lock; otherwise everything
    // handed over must have come out
    if checker.mux.arbiter_state() == ArbiterState::Idle {
        assert_eq!(checker.a.delivered, checker.a.handed_over);
        assert_eq!(checker.b.delivered, checker.b.handed_over);
        assert!(checker.mux.is_drained());
    }
});
