//! Single-slot elastic buffer.
//!
//! Sits on every input path and decouples the producer's handshake from the
//! consumer's. With the slot empty the producer's beat passes straight
//! through in the same step. When the consumer stalls, the one beat the
//! producer already handed over is parked in the slot and the producer sees
//! ready drop on the next step.
//!
//! ```text
//!                 ┌─────────────────────┐
//! producer ──────>│ slot: Option<T>     │──────> consumer
//! producer_ready <│ = consumer_ready    │<────── consumer_ready
//!                 │   || slot.is_none() │
//!                 └─────────────────────┘
//! ```
//!
//! The slot is always drained before a later beat is emitted, so order is
//! preserved, and a parked beat is presented on every step until the
//! consumer takes it.

/// Signals driven by the buffer during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElasticOutputs<T> {
    /// Ready presented to the producer
    pub producer_ready: bool,
    /// Beat presented to the consumer (`None` when there is nothing valid)
    pub consumer: Option<T>,
}

/// Capacity-1 elastic buffer.
///
/// Generic over the transferred item so the same element can sit in front of
/// either input. The multiplexer instantiates it with [`crate::Beat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticBuffer<T> {
    slot: Option<T>,
}

impl<T> Default for ElasticBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ElasticBuffer<T> {
    /// Create an empty buffer.
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Whether a beat is parked in the slot.
    pub fn is_occupied(&self) -> bool {
        self.slot.is_some()
    }

    /// Ready presented to the producer for a given consumer ready.
    pub fn producer_ready(&self, consumer_ready: bool) -> bool {
        consumer_ready || self.slot.is_none()
    }

    /// Synchronous reset: drop the parked beat.
    pub fn reset(&mut self) {
        self.slot = None;
    }
}

impl<T: Copy> ElasticBuffer<T> {
    /// Beat presented to the consumer this step.
    ///
    /// Does not depend on the consumer's ready, so a downstream element can
    /// look at it before deciding its own ready.
    pub fn output(&self, producer: Option<T>) -> Option<T> {
        self.slot.or(producer)
    }

    /// Advance one clock step.
    ///
    /// `producer` is the beat offered upstream this step and
    /// `consumer_ready` the ready seen downstream. Outputs are computed from
    /// the state before the step; the slot is updated afterwards.
    pub fn step(&mut self, producer: Option<T>, consumer_ready: bool) -> ElasticOutputs<T> {
        let producer_ready = self.producer_ready(consumer_ready);
        let consumer = self.output(producer);
        let admitted = if producer_ready { producer } else { None };
        let drained = consumer.is_some() && consumer_ready;

        match self.slot {
            // Drain and refill in the same step, or just drain
            Some(_) if drained => self.slot = admitted,
            // Pass-through stalled: keep the beat we accepted
            None if !consumer_ready => self.slot = admitted,
            _ => {},
        }

        ElasticOutputs { producer_ready, consumer }
    }
}
