//! Bounded FIFO with early backpressure.
//!
//! Buffers channel B between its elastic buffer and the arbiter so that
//! bursts on B do not stall the producer while A holds the output.
//!
//! # Almost-full threshold
//!
//! Write ready drops as soon as occupancy reaches `capacity - margin`
//! rather than `capacity`. A producer that needs up to `margin` steps to
//! observe ready going low can still land its in-flight beats without the
//! queue ever overflowing. The queue cannot measure that reaction time
//! itself: sizing `margin` to cover it is a contract with the integrator.
//!
//! ```text
//!   0                      capacity - margin        capacity
//!   |---- write_ready -------------|---- headroom -----|
//! ```

use std::collections::VecDeque;

use crate::{beat::Beat, config::MuxConfig, error::ConfigError};

/// Signals driven by the queue during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOutputs {
    /// Write-side ready (occupancy below the almost-full threshold)
    pub write_ready: bool,
    /// Whether the offered write beat was admitted this step
    pub admitted: bool,
    /// Head beat presented to the reader this step
    pub head: Option<Beat>,
    /// Head beat released to the reader this step
    pub released: Option<Beat>,
}

/// Bounded beat FIFO
#[derive(Debug, Clone)]
pub struct BeatQueue {
    storage: VecDeque<Beat>,
    capacity: usize,
    margin: usize,
    high_watermark: usize,
}

impl BeatQueue {
    /// Create an empty queue.
    ///
    /// # Errors
    /// Returns `MarginNotBelowCapacity` unless `capacity > margin`
    pub fn new(capacity: usize, margin: usize) -> Result<Self, ConfigError> {
        MuxConfig { queue_capacity: capacity, queue_margin: margin }.validate()?;

        Ok(Self { storage: VecDeque::with_capacity(capacity), capacity, margin, high_watermark: 0 })
    }

    /// Create a queue sized from a multiplexer configuration.
    pub fn from_config(config: &MuxConfig) -> Result<Self, ConfigError> {
        Self::new(config.queue_capacity, config.queue_margin)
    }

    /// Number of beats held.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the queue holds no beats.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Maximum number of beats the queue can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Occupancy at which write ready drops.
    pub fn threshold(&self) -> usize {
        self.capacity - self.margin
    }

    /// Highest occupancy seen since construction or the last reset.
    pub fn high_watermark(&self) -> usize {
        self.high_watermark
    }

    /// Write-side ready for this step.
    pub fn write_ready(&self) -> bool {
        self.storage.len() < self.threshold()
    }

    /// Beat presented to the reader this step.
    pub fn head(&self) -> Option<Beat> {
        self.storage.front().copied()
    }

    /// Advance one clock step.
    ///
    /// Release is decided on the contents before the step, so a beat
    /// admitted into an empty queue is never released in the same step.
    pub fn step(&mut self, write: Option<Beat>, read_ready: bool) -> QueueOutputs {
        let write_ready = self.write_ready();
        let head = self.head();

        let released = if read_ready { self.storage.pop_front() } else { None };

        let admitted = match write {
            Some(beat) if write_ready => {
                debug_assert!(self.storage.len() < self.capacity, "queue overflow");
                self.storage.push_back(beat);
                true
            },
            _ => false,
        };

        if self.storage.len() > self.high_watermark {
            self.high_watermark = self.storage.len();
        }

        let now_ready = self.write_ready();
        if write_ready && !now_ready {
            tracing::debug!(len = self.storage.len(), threshold = self.threshold(), "queue almost full");
        } else if !write_ready && now_ready {
            tracing::debug!(len = self.storage.len(), "queue accepting again");
        }

        QueueOutputs { write_ready, admitted, head, released }
    }

    /// Synchronous reset: drop all queued beats.
    pub fn reset(&mut self) {
        self.storage.clear();
        self.high_watermark = 0;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn rejects_margin_at_or_above_capacity() {
        assert!(matches!(
            BeatQueue::new(3, 3),
            Err(ConfigError::MarginNotBelowCapacity { capacity: 3, margin: 3 })
        ));
        assert!(BeatQueue::new(2, 5).is_err());
        assert!(BeatQueue::new(4, 3).is_ok());
    }

    #[test]
    fn fifo_order() {
        let mut q = BeatQueue::new(8, 2).unwrap();

        for i in 0..4 {
            q.step(Some(Beat::single(i)), false);
        }
        assert_eq!(q.len(), 4);

        let mut out = Vec::new();
        while let Some(beat) = q.step(None, true).released {
            out.push(beat.data);
        }
        assert_eq!(out, vec![0, 1, 2, 3]);
        assert!(q.is_empty());
    }

    #[test]
    fn write_and_read_on_empty_queue_yields_one() {
        let mut q = BeatQueue::new(8, 2).unwrap();

        let out = q.step(Some(Beat::single(9)), true);
        assert!(out.admitted);
        assert_eq!(out.head, None);
        assert_eq!(out.released, None);
        assert_eq!(q.len(), 1);
        assert_eq!(q.head(), Some(Beat::single(9)));
    }

    #[test]
    fn simultaneous_write_and_read_keeps_count() {
        let mut q = BeatQueue::new(8, 2).unwrap();
        q.step(Some(Beat::single(1)), false);
        q.step(Some(Beat::single(2)), false);

        let out = q.step(Some(Beat::single(3)), true);
        assert!(out.admitted);
        assert_eq!(out.released, Some(Beat::single(1)));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn write_ready_drops_exactly_at_threshold() {
        let mut q = BeatQueue::new(16, 3).unwrap();
        assert_eq!(q.threshold(), 13);

        for i in 0..13 {
            assert!(q.write_ready(), "ready should hold below threshold at {i}");
            let out = q.step(Some(Beat::single(i)), false);
            assert!(out.admitted);
        }

        assert_eq!(q.len(), 13);
        assert!(!q.write_ready());

        // Flood keeps offering, nothing more is admitted
        for _ in 0..10 {
            let out = q.step(Some(Beat::single(99)), false);
            assert!(!out.write_ready);
            assert!(!out.admitted);
        }
        assert_eq!(q.len(), 13);
        assert_eq!(q.high_watermark(), 13);

        // One release brings ready back for the following step
        q.step(None, true);
        assert_eq!(q.len(), 12);
        assert!(q.write_ready());
    }

    #[test]
    fn reset_empties_queue() {
        let mut q = BeatQueue::new(4, 1).unwrap();
        q.step(Some(Beat::single(1)), false);
        q.reset();
        assert!(q.is_empty());
        assert_eq!(q.high_watermark(), 0);
        assert!(q.write_ready());
    }

    proptest! {
        /// Occupancy tracks admitted minus released, never reaches
        /// capacity, and output order matches admission order.
        #[test]
        fn prop_bounded_fifo(
            capacity in 2..32usize,
            margin_seed in any::<usize>(),
            ops in prop::collection::vec((any::<bool>(), any::<bool>()), 0..200),
        ) {
            let margin = margin_seed % capacity;
            let mut q = BeatQueue::new(capacity, margin).unwrap();
            let mut admitted = Vec::new();
            let mut released = Vec::new();

            for (i, (write, read)) in ops.into_iter().enumerate() {
                let before = q.len();
                let beat = write.then(|| Beat::single(i as u64));
                let out = q.step(beat, read);

                if out.admitted {
                    admitted.push(i as u64);
                }
                if let Some(b) = out.released {
                    released.push(b.data);
                }

                prop_assert!(q.len() <= capacity);
                prop_assert!(q.len() <= q.threshold());
                prop_assert!(q.len().abs_diff(before) <= 1);
                prop_assert_eq!(q.len(), admitted.len() - released.len());
            }

            prop_assert_eq!(&admitted[..released.len()], &released[..]);
        }
    }
}
