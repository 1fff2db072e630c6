//! Valid/ready activity patterns.
//!
//! A [`SignalPattern`] says when a source is willing to present a beat or
//! when the sink asserts ready. A [`SignalDriver`] walks a pattern one step
//! at a time.

use crate::sim_env::SimEnv;

/// Per-step level of a handshake signal.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SignalPattern {
    /// High on every step
    #[default]
    Always,
    /// Low on every step
    Never,
    /// `(steps, level)` segments, repeated forever
    Cycle(Vec<(u32, bool)>),
    /// `(steps, level)` segments played once, then high forever
    Script(Vec<(u32, bool)>),
    /// High with the given probability on each step
    Random {
        /// Probability of the signal being high
        probability: f64,
    },
}

/// Steps through a [`SignalPattern`].
#[derive(Debug, Clone)]
pub struct SignalDriver {
    pattern: SignalPattern,
    segment: usize,
    elapsed: u32,
}

impl SignalDriver {
    /// Start a pattern from its first step.
    pub fn new(pattern: SignalPattern) -> Self {
        Self { pattern, segment: 0, elapsed: 0 }
    }

    /// Level for the next step.
    pub fn next(&mut self, env: &mut SimEnv) -> bool {
        match &self.pattern {
            SignalPattern::Always => true,
            SignalPattern::Never => false,
            SignalPattern::Random { probability } => env.chance(*probability),
            SignalPattern::Cycle(segments) => {
                advance(segments, &mut self.segment, &mut self.elapsed, true).unwrap_or(true)
            },
            SignalPattern::Script(segments) => {
                advance(segments, &mut self.segment, &mut self.elapsed, false).unwrap_or(true)
            },
        }
    }
}

/// Level of the current segment, moving to the next one when exhausted.
///
/// Returns `None` once a non-repeating pattern is finished, or when every
/// segment is zero length.
fn advance(
    segments: &[(u32, bool)],
    index: &mut usize,
    elapsed: &mut u32,
    repeat: bool,
) -> Option<bool> {
    for _ in 0..=segments.len() {
        if *index >= segments.len() {
            if !repeat || segments.is_empty() {
                return None;
            }
            *index = 0;
        }

        let (len, level) = segments[*index];
        if *elapsed < len {
            *elapsed += 1;
            return Some(level);
        }

        *index += 1;
        *elapsed = 0;
    }

    None
}
