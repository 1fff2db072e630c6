//! Scenario builder API.
//!
//! Provides a declarative API for constructing scenario tests that enforce
//! the Oracle Pattern.

use packet_mux_core::{Channel, MuxConfig};

use crate::{
    DEFAULT_MAX_STEPS, RESET_CYCLES,
    error::HarnessError,
    packet::Packet,
    scenario::{OracleFn, World},
    signal::SignalPattern,
    source::Source,
};

/// Scenario builder.
///
/// Construct a scenario by queueing packets and choosing stall patterns.
/// Must call `.oracle()` to get a [`RunnableScenario`] that can be executed.
pub struct Scenario {
    name: String,
    config: MuxConfig,
    seed: u64,
    max_steps: u64,
    packets_a: Vec<Packet>,
    packets_b: Vec<Packet>,
    stalls_a: SignalPattern,
    stalls_b: SignalPattern,
    sink_ready: SignalPattern,
}

impl Scenario {
    /// Create a new scenario with default configuration and no traffic.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: MuxConfig::default(),
            seed: 0,
            max_steps: DEFAULT_MAX_STEPS,
            packets_a: Vec::new(),
            packets_b: Vec::new(),
            stalls_a: SignalPattern::Always,
            stalls_b: SignalPattern::Always,
            sink_ready: SignalPattern::Always,
        }
    }

    /// Use a custom multiplexer configuration.
    pub fn config(mut self, config: MuxConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed for every random decision in the run.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Step budget for the traffic to drain.
    pub fn max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Queue a packet on channel A.
    pub fn packet_a(mut self, packet: Packet) -> Self {
        self.packets_a.push(packet);
        self
    }

    /// Queue a packet on channel B.
    pub fn packet_b(mut self, packet: Packet) -> Self {
        self.packets_b.push(packet);
        self
    }

    /// Queue several packets on one channel.
    pub fn packets(mut self, channel: Channel, packets: impl IntoIterator<Item = Packet>) -> Self {
        match channel {
            Channel::A => self.packets_a.extend(packets),
            Channel::B => self.packets_b.extend(packets),
        }
        self
    }

    /// When a source may present its next beat.
    pub fn source_stalls(mut self, channel: Channel, pattern: SignalPattern) -> Self {
        match channel {
            Channel::A => self.stalls_a = pattern,
            Channel::B => self.stalls_b = pattern,
        }
        self
    }

    /// Ready pattern of the output sink.
    pub fn sink_ready(mut self, pattern: SignalPattern) -> Self {
        self.sink_ready = pattern;
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// 1. Build the world and hold reset for [`RESET_CYCLES`] steps
    /// 2. Queue every packet on its source
    /// 3. Step until all traffic has left through the output
    /// 4. Run the oracle against the final world
    ///
    /// Returns the final world so callers can make further assertions.
    pub fn run(self) -> Result<World, HarnessError> {
        let Scenario {
            name,
            config,
            seed,
            max_steps,
            packets_a,
            packets_b,
            stalls_a,
            stalls_b,
            sink_ready,
        } = self.scenario;

        let beats: usize = packets_a.iter().chain(&packets_b).map(Packet::beat_count).sum();

        let mut world = World::new(config, seed)?;
        world.reset(RESET_CYCLES);

        let mut source_a = Source::with_pattern(Channel::A, stalls_a);
        packets_a.into_iter().for_each(|p| source_a.queue_packet(p));
        let mut source_b = Source::with_pattern(Channel::B, stalls_b);
        packets_b.into_iter().for_each(|p| source_b.queue_packet(p));

        world.set_source(source_a);
        world.set_source(source_b);
        world.set_sink(sink_ready);

        let steps = world.run_until_idle(max_steps)?;

        tracing::info!(
            scenario = %name,
            seed,
            steps,
            beats,
            packets = world.sink().packets().len(),
            queue_peak = world.mux().queue_high_watermark(),
            "scenario drained"
        );

        (self.oracle)(&world)
            .map_err(|reason| HarnessError::Oracle { scenario: name, reason })?;

        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_requires_oracle() {
        // This should compile - oracle provided
        let _scenario = Scenario::new("test").packet_a(Packet::from_words(vec![1])).oracle(Box::new(|_world| Ok(())));

        // This should NOT compile - no oracle
        // let scenario = Scenario::new("test");
        // scenario.run(); // ERROR: no method `run` on type `Scenario`
    }

    #[test]
    fn oracle_failure_is_reported_with_scenario_name() {
        let result = Scenario::new("always fails")
            .packet_a(Packet::from_words(vec![1]))
            .oracle(Box::new(|_world| Err("nope".to_string())))
            .run();

        match result {
            Err(HarnessError::Oracle { scenario, reason }) => {
                assert_eq!(scenario, "always fails");
                assert_eq!(reason, "nope");
            },
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn stuck_sink_reports_stall() {
        let result = Scenario::new("sink never ready")
            .packet_a(Packet::from_words(vec![1, 2]))
            .sink_ready(SignalPattern::Never)
            .max_steps(20)
            .oracle(Box::new(|_world| Ok(())))
            .run();

        assert!(matches!(result, Err(HarnessError::Stalled { steps: 20, .. })));
    }

    #[test]
    fn bad_config_is_rejected_before_running() {
        let result = Scenario::new("bad config")
            .config(MuxConfig { queue_capacity: 3, queue_margin: 3 })
            .oracle(Box::new(|_world| Ok(())))
            .run();

        assert!(matches!(result, Err(HarnessError::Config(_))));
    }
}
