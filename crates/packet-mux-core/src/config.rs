//! Multiplexer configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Width of the payload word in bits.
pub const DATA_WIDTH_BITS: usize = 64;

/// Payload bytes carried by one full beat.
pub const BYTES_PER_BEAT: usize = DATA_WIDTH_BITS / 8;

/// Width of the `empty` field, enough to count every byte but one in a beat.
pub const EMPTY_WIDTH_BITS: u32 = BYTES_PER_BEAT.trailing_zeros();

/// Bits of a `u8` that the `empty` field can hold.
pub const EMPTY_MASK: u8 = (1 << EMPTY_WIDTH_BITS) - 1;

/// Default capacity of the channel B queue, in beats.
pub const DEFAULT_QUEUE_CAPACITY: usize = 512;

/// Default reaction margin of the channel B queue, in steps.
pub const DEFAULT_QUEUE_MARGIN: usize = 3;

/// Multiplexer configuration
///
/// `queue_margin` is the number of steps the upstream producer may take to
/// react to the queue's ready going low. The queue stops admitting once
/// occupancy reaches `queue_capacity - queue_margin`. Whether the margin
/// actually covers the upstream round-trip latency is the integrator's
/// responsibility; nothing here can observe that latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuxConfig {
    /// Queue capacity in beats
    pub queue_capacity: usize,
    /// Almost-full headroom in beats
    pub queue_margin: usize,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self { queue_capacity: DEFAULT_QUEUE_CAPACITY, queue_margin: DEFAULT_QUEUE_MARGIN }
    }
}

impl MuxConfig {
    /// Check that the queue can admit at least one beat.
    ///
    /// # Errors
    /// Returns `MarginNotBelowCapacity` unless `queue_capacity > queue_margin`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity <= self.queue_margin {
            return Err(ConfigError::MarginNotBelowCapacity {
                capacity: self.queue_capacity,
                margin: self.queue_margin,
            });
        }
        Ok(())
    }

    /// Occupancy at which the queue stops admitting beats.
    pub fn almost_full_threshold(&self) -> usize {
        self.queue_capacity.saturating_sub(self.queue_margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_widths() {
        assert_eq!(BYTES_PER_BEAT, 8);
        assert_eq!(EMPTY_WIDTH_BITS, 3);
        assert_eq!(EMPTY_MASK, 0b111);
    }

    #[test]
    fn default_config_is_valid() {
        let config = MuxConfig::default();
        assert_eq!(config.queue_capacity, 512);
        assert_eq!(config.queue_margin, 3);
        assert!(config.validate().is_ok());
        assert_eq!(config.almost_full_threshold(), 509);
    }

    #[test]
    fn margin_must_be_below_capacity() {
        let config = MuxConfig { queue_capacity: 4, queue_margin: 4 };
        assert_eq!(
            config.validate(),
            Err(ConfigError::MarginNotBelowCapacity { capacity: 4, margin: 4 })
        );

        let config = MuxConfig { queue_capacity: 0, queue_margin: 0 };
        assert!(config.validate().is_err());

        let config = MuxConfig { queue_capacity: 1, queue_margin: 0 };
        assert!(config.validate().is_ok());
    }
}
