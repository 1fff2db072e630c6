//! Seeded simulation environment.
//!
//! Every random decision in a simulation (idle gaps, backpressure, random
//! payloads) draws from one ChaCha stream, so a seed fully determines a run.

use std::ops::RangeInclusive;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic source of randomness for a simulation.
#[derive(Debug, Clone)]
pub struct SimEnv {
    seed: u64,
    rng: ChaCha8Rng,
}

impl SimEnv {
    /// Create an environment from a seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed, rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Seed this environment was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Bernoulli draw. Probabilities outside `0.0..=1.0` are clamped.
    pub fn chance(&mut self, probability: f64) -> bool {
        if probability.is_nan() || probability <= 0.0 {
            false
        } else if probability >= 1.0 {
            true
        } else {
            self.rng.gen_bool(probability)
        }
    }

    /// Uniform random payload word.
    pub fn word(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Uniform draw from an inclusive range.
    pub fn range(&mut self, range: RangeInclusive<usize>) -> usize {
        if range.is_empty() {
            return *range.start();
        }
        self.rng.gen_range(range)
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}
