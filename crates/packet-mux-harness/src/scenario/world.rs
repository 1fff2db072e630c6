//! World state for scenario execution.
//!
//! The World owns the multiplexer, both sources, the sink and the
//! environment, and steps them together one clock tick at a time. Every
//! step is appended to a [`Trace`] for oracle verification.

use packet_mux_core::{Channel, MuxConfig, MuxInputs, MuxOutputs, PacketMux};

use crate::{
    error::HarnessError,
    signal::SignalPattern,
    sim_env::SimEnv,
    sink::Sink,
    source::Source,
    trace::{StepRecord, Trace},
};

/// World state containing all actors and the step log.
#[derive(Debug, Clone)]
pub struct World {
    mux: PacketMux,
    env: SimEnv,
    source_a: Source,
    source_b: Source,
    sink: Sink,
    trace: Trace,
}

impl World {
    /// Create a world with always-valid sources and an always-ready sink.
    pub fn new(config: MuxConfig, seed: u64) -> Result<Self, HarnessError> {
        Ok(Self {
            mux: PacketMux::new(config)?,
            env: SimEnv::with_seed(seed),
            source_a: Source::new(Channel::A),
            source_b: Source::new(Channel::B),
            sink: Sink::default(),
            trace: Trace::new(),
        })
    }

    /// Replace the source on one channel.
    pub fn set_source(&mut self, source: Source) {
        match source.channel() {
            Channel::A => self.source_a = source,
            Channel::B => self.source_b = source,
        }
    }

    /// Replace the sink's ready pattern.
    pub fn set_sink(&mut self, pattern: SignalPattern) {
        self.sink = Sink::new(pattern);
    }

    /// The multiplexer under test.
    pub fn mux(&self) -> &PacketMux {
        &self.mux
    }

    /// Source for one channel.
    pub fn source(&self, channel: Channel) -> &Source {
        match channel {
            Channel::A => &self.source_a,
            Channel::B => &self.source_b,
        }
    }

    /// Mutable source for one channel.
    pub fn source_mut(&mut self, channel: Channel) -> &mut Source {
        match channel {
            Channel::A => &mut self.source_a,
            Channel::B => &mut self.source_b,
        }
    }

    /// The output monitor.
    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    /// The step log.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Hold reset for `cycles` steps. Sources and sink are not driven.
    ///
    /// Reset reaches the whole test bench: traffic still queued on the
    /// sources is dropped along with their history, the sink forgets what
    /// it saw and the trace restarts. Signal patterns keep their position.
    pub fn reset(&mut self, cycles: u32) {
        let discarded = self.backlog();
        for _ in 0..cycles {
            self.mux.reset();
        }
        self.source_a.clear();
        self.source_b.clear();
        self.sink.clear();
        self.trace = Trace::new();

        tracing::debug!(seed = self.env.seed(), cycles, discarded, "world reset");
    }

    /// Advance one clock step with sources and sink driving the ports.
    pub fn step(&mut self) -> MuxOutputs {
        let inputs = MuxInputs {
            a: self.source_a.offer(&mut self.env),
            b: self.source_b.offer(&mut self.env),
            out_ready: self.sink.ready(&mut self.env),
        };
        self.step_with(inputs)
    }

    /// Clock the multiplexer with the port inputs the actors produced.
    fn step_with(&mut self, inputs: MuxInputs) -> MuxOutputs {
        let cycle = self.mux.cycle();
        let outputs = self.mux.step(inputs);

        if inputs.a.is_some() {
            self.source_a.complete(outputs.a_ready);
        }
        if inputs.b.is_some() {
            self.source_b.complete(outputs.b_ready);
        }
        self.sink.observe(cycle, outputs.grant, outputs.delivered);
        self.trace.record(StepRecord::new(cycle, &inputs, &outputs));

        outputs
    }

    /// Beats not yet accepted from the sources, plus the queue occupancy.
    pub fn backlog(&self) -> usize {
        self.source_a.backlog() + self.source_b.backlog() + self.mux.queue_len()
    }

    /// Whether every queued beat has left through the output.
    pub fn is_idle(&self) -> bool {
        self.source_a.is_idle() && self.source_b.is_idle() && self.mux.is_drained()
    }

    /// Step until idle, at most `max_steps` times.
    ///
    /// Returns the number of steps taken.
    ///
    /// # Errors
    /// Returns `Stalled` if traffic is still pending after `max_steps`
    pub fn run_until_idle(&mut self, max_steps: u64) -> Result<u64, HarnessError> {
        let mut steps = 0;
        while !self.is_idle() {
            if steps >= max_steps {
                return Err(HarnessError::Stalled { steps, backlog: self.backlog() });
            }
            self.step();
            steps += 1;
        }
        Ok(steps)
    }

    /// Step a fixed number of times regardless of idleness.
    pub fn run_for(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }
}
