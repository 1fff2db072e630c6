//! Beat and channel types.
//!
//! A beat is one transfer on a streaming port. The `valid` handshake signal
//! is not a field: a port that has data this step presents `Some(beat)`, an
//! idle port presents `None`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{BYTES_PER_BEAT, EMPTY_MASK};

/// One atomic transfer unit of a stream.
///
/// Beats are never modified inside the multiplexer. Every field that enters
/// on an input port leaves on the output port unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Beat {
    /// Payload word
    pub data: u64,
    /// First beat of a frame
    pub start_of_frame: bool,
    /// Last beat of a frame
    pub end_of_frame: bool,
    /// Number of low-order bytes of `data` that are not payload.
    ///
    /// Only meaningful on the beat carrying `end_of_frame`.
    pub empty: u8,
    /// Opaque error annotation, passed through untouched
    pub error: bool,
}

impl Beat {
    /// Beat that is neither first nor last in its frame.
    pub fn new(data: u64) -> Self {
        Self { data, ..Self::default() }
    }

    /// One-beat frame carrying both framing flags.
    pub fn single(data: u64) -> Self {
        Self { data, start_of_frame: true, end_of_frame: true, ..Self::default() }
    }

    /// Mark this beat as the first of a frame.
    #[must_use]
    pub fn with_start(mut self) -> Self {
        self.start_of_frame = true;
        self
    }

    /// Mark this beat as the last of a frame with `empty` unused bytes.
    ///
    /// `empty` is an `EMPTY_WIDTH_BITS`-wide field; higher bits are dropped.
    #[must_use]
    pub fn with_end(mut self, empty: u8) -> Self {
        self.end_of_frame = true;
        self.empty = empty & EMPTY_MASK;
        self
    }

    /// Set the error annotation.
    #[must_use]
    pub fn with_error(mut self, error: bool) -> Self {
        self.error = error;
        self
    }

    /// Whether this beat opens a frame that continues on later beats.
    ///
    /// This is the condition under which the arbiter locks onto a channel.
    pub fn opens_multi_beat_frame(&self) -> bool {
        self.start_of_frame && !self.end_of_frame
    }

    /// Number of payload bytes carried by this beat.
    pub fn valid_bytes(&self) -> usize {
        if self.end_of_frame {
            BYTES_PER_BEAT.saturating_sub(usize::from(self.empty))
        } else {
            BYTES_PER_BEAT
        }
    }
}

/// Input channel of the multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    /// High priority input, fed straight into the arbiter
    A,
    /// Low priority input, buffered by the queue
    B,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}
