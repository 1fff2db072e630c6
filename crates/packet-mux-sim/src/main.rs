//! Packet multiplexer simulator.
//!
//! Runs a seeded stress simulation: both channels send a batch of
//! Ethernet-sized packets while the sources pause at random and the output
//! applies random backpressure. Every standard oracle is checked at the end,
//! and the step trace can be written out as CBOR.
//!
//! ```text
//! packet-mux-sim --seed 7 --packets 64 --ready-probability 0.5 --trace run.cbor
//! RUST_LOG=packet_mux_core=debug packet-mux-sim --queue-capacity 16 --queue-margin 2
//! ```

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use packet_mux_core::{
    Channel, ConfigError, MuxConfig,
    config::{DEFAULT_QUEUE_CAPACITY, DEFAULT_QUEUE_MARGIN},
};
use packet_mux_harness::{
    Fill, HarnessError, Packet, SignalPattern, SimEnv,
    scenario::{Scenario, World, oracle},
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Seeded two-channel packet multiplexer simulation
#[derive(Parser, Debug, Clone)]
#[command(name = "packet-mux-sim")]
#[command(about = "Stress the packet multiplexer with random traffic and backpressure")]
struct Args {
    /// Seed for payloads, packet sizes, stalls and backpressure
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Packets sent on each channel
    #[arg(short, long, default_value_t = 32)]
    packets: usize,

    /// Fixed packet size in bytes (random Ethernet sizes when omitted)
    #[arg(long)]
    packet_bytes: Option<usize>,

    /// Queue capacity in beats
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Free slots left when the queue stops accepting
    #[arg(long, default_value_t = DEFAULT_QUEUE_MARGIN)]
    queue_margin: usize,

    /// Probability that the output is ready on a step
    #[arg(long, default_value_t = 0.75)]
    ready_probability: f64,

    /// Probability that a source holds back its next beat on a step
    #[arg(long, default_value_t = 0.1)]
    stall_probability: f64,

    /// Step budget for all traffic to drain
    #[arg(long, default_value_t = 1_000_000)]
    max_steps: u64,

    /// Write the step trace as CBOR to this file
    #[arg(long)]
    trace: Option<PathBuf>,
}

/// Simulator errors
#[derive(Debug, Error)]
enum SimError {
    /// Queue configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Packet generation, simulation or oracle failure
    #[error(transparent)]
    Harness(#[from] HarnessError),

    /// Probability argument outside `[0, 1]`
    #[error("{name} must be between 0 and 1, got {value}")]
    Probability {
        /// Argument name
        name: &'static str,
        /// Value supplied
        value: f64,
    },

    /// Trace file could not be written
    #[error("cannot write trace file {}: {source}", path.display())]
    TraceFile {
        /// Path requested
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Summary {
    steps: usize,
    packets_a: usize,
    packets_b: usize,
    beats: usize,
    bytes: usize,
    queue_peak: usize,
}

impl Summary {
    fn from_world(world: &World) -> Self {
        Self {
            steps: world.trace().len(),
            packets_a: world.sink().packets_from(Channel::A).len(),
            packets_b: world.sink().packets_from(Channel::B).len(),
            beats: world.sink().delivered().len(),
            bytes: world.sink().packets().iter().map(|p| p.packet.len_bytes()).sum(),
            queue_peak: world.mux().queue_high_watermark(),
        }
    }

    /// Delivered beats per step.
    fn utilisation(&self) -> f64 {
        if self.steps == 0 { 0.0 } else { self.beats as f64 / self.steps as f64 }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    match run(&args) {
        Ok(summary) => {
            tracing::info!(
                seed = args.seed,
                steps = summary.steps,
                packets_a = summary.packets_a,
                packets_b = summary.packets_b,
                beats = summary.beats,
                bytes = summary.bytes,
                queue_peak = summary.queue_peak,
                utilisation = summary.utilisation(),
                "simulation passed"
            );
            ExitCode::SUCCESS
        },
        Err(error) => {
            tracing::error!(seed = args.seed, %error, "simulation failed");
            ExitCode::FAILURE
        },
    }
}

fn run(args: &Args) -> Result<Summary, SimError> {
    let config = MuxConfig { queue_capacity: args.queue_capacity, queue_margin: args.queue_margin };
    config.validate()?;
    let ready = probability("ready-probability", args.ready_probability)?;
    let stall = probability("stall-probability", args.stall_probability)?;

    let mut env = SimEnv::with_seed(args.seed);
    let traffic_a = generate(args, &mut env)?;
    let traffic_b = generate(args, &mut env)?;

    tracing::info!(
        seed = args.seed,
        packets = args.packets,
        capacity = config.queue_capacity,
        margin = config.queue_margin,
        "starting simulation"
    );

    let source_pattern = SignalPattern::Random { probability: 1.0 - stall };
    let world = Scenario::new("alternating ports stress")
        .seed(args.seed)
        .config(config)
        .packets(Channel::A, traffic_a)
        .packets(Channel::B, traffic_b)
        .source_stalls(Channel::A, source_pattern.clone())
        .source_stalls(Channel::B, source_pattern)
        .sink_ready(SignalPattern::Random { probability: ready })
        .max_steps(args.max_steps)
        .oracle(oracle::standard())
        .run()?;

    if let Some(path) = &args.trace {
        let file_error = |source| SimError::TraceFile { path: path.clone(), source };
        let mut writer = BufWriter::new(File::create(path).map_err(file_error)?);
        world.trace().write_cbor(&mut writer)?;
        writer.flush().map_err(file_error)?;
        tracing::info!(path = %path.display(), steps = world.trace().len(), "trace written");
    }

    Ok(Summary::from_world(&world))
}

fn generate(args: &Args, env: &mut SimEnv) -> Result<Vec<Packet>, HarnessError> {
    (0..args.packets)
        .map(|_| match args.packet_bytes {
            Some(len) => Packet::ethernet(len, Fill::Random, env),
            None => Packet::random_ethernet(Fill::Random, env),
        })
        .collect()
}

fn probability(name: &'static str, value: f64) -> Result<f64, SimError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(SimError::Probability { name, value })
    }
}
