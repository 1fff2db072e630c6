//! Packet builder.
//!
//! A packet is a list of payload words plus the metadata carried on its
//! last beat. Ethernet-sized packets (64 to 1518 bytes) are built with
//! [`Packet::ethernet`]; shorter frames for edge-case tests with
//! [`Packet::from_words`].

use packet_mux_core::{
    Beat,
    config::{BYTES_PER_BEAT, EMPTY_MASK},
};

use crate::{error::HarnessError, sim_env::SimEnv};

/// Smallest Ethernet frame, without preamble/SFD.
pub const MIN_PACKET_BYTES: usize = 64;

/// Largest Ethernet frame, without preamble/SFD.
pub const MAX_PACKET_BYTES: usize = 1518;

/// Payload fill pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// `start, start + 1, ...`
    Incrementing {
        /// First word
        start: u64,
    },
    /// Every bit set
    AllOnes,
    /// Every bit clear
    AllZeros,
    /// `0xAAAA...` and `0x5555...` on even and odd words
    Alternating,
    /// Random words drawn from the simulation environment
    Random,
}

/// One frame worth of payload and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    /// Payload words, one per beat
    pub words: Vec<u64>,
    /// Unused bytes in the last word
    pub empty: u8,
    /// Error annotation, repeated on every beat
    pub error: bool,
}

impl Packet {
    /// Packet from raw words with no unused bytes and no error.
    pub fn from_words(words: Vec<u64>) -> Self {
        Self { words, empty: 0, error: false }
    }

    /// Ethernet-sized packet of `len` bytes.
    ///
    /// Words are `ceil(len / 8)`, the last word's unused bytes are zeroed
    /// and counted in `empty`.
    ///
    /// # Errors
    /// Returns `PacketSize` if `len` is outside
    /// `MIN_PACKET_BYTES..=MAX_PACKET_BYTES`
    pub fn ethernet(len: usize, fill: Fill, env: &mut SimEnv) -> Result<Self, HarnessError> {
        if !(MIN_PACKET_BYTES..=MAX_PACKET_BYTES).contains(&len) {
            return Err(HarnessError::PacketSize {
                len,
                min: MIN_PACKET_BYTES,
                max: MAX_PACKET_BYTES,
            });
        }

        let count = len.div_ceil(BYTES_PER_BEAT);
        let empty = count * BYTES_PER_BEAT - len;

        let mut words: Vec<u64> = (0..count as u64)
            .map(|i| match fill {
                Fill::Incrementing { start } => start.wrapping_add(i),
                Fill::AllOnes => u64::MAX,
                Fill::AllZeros => 0,
                Fill::Alternating if i % 2 == 0 => 0xAAAA_AAAA_AAAA_AAAA,
                Fill::Alternating => 0x5555_5555_5555_5555,
                Fill::Random => env.word(),
            })
            .collect();

        if empty > 0 {
            let valid_bits = (BYTES_PER_BEAT - empty) * 8;
            if let Some(last) = words.last_mut() {
                *last &= (1u64 << valid_bits) - 1;
            }
        }

        Ok(Self { words, empty: empty as u8, error: false })
    }

    /// Ethernet-sized packet with a random length.
    pub fn random_ethernet(fill: Fill, env: &mut SimEnv) -> Result<Self, HarnessError> {
        let len = env.range(MIN_PACKET_BYTES..=MAX_PACKET_BYTES);
        Self::ethernet(len, fill, env)
    }

    /// Set the unused byte count of the last word.
    #[must_use]
    pub fn with_empty(mut self, empty: u8) -> Self {
        self.empty = empty & EMPTY_MASK;
        self
    }

    /// Set the error annotation.
    #[must_use]
    pub fn with_error(mut self, error: bool) -> Self {
        self.error = error;
        self
    }

    /// Number of beats this packet occupies.
    pub fn beat_count(&self) -> usize {
        self.words.len()
    }

    /// Payload length in bytes.
    pub fn len_bytes(&self) -> usize {
        self.beats().iter().map(Beat::valid_bytes).sum()
    }

    /// Beats as a source drives them: `empty` only on the last beat,
    /// `error` on every beat. An empty packet yields no beats.
    pub fn beats(&self) -> Vec<Beat> {
        let last = self.words.len().saturating_sub(1);
        self.words
            .iter()
            .enumerate()
            .map(|(i, &data)| Beat {
                data,
                start_of_frame: i == 0,
                end_of_frame: i == last,
                empty: if i == last { self.empty } else { 0 },
                error: self.error,
            })
            .collect()
    }
}
