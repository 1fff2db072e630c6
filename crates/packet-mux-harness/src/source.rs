//! Queued source driver for one input channel.
//!
//! Packets are queued up front and sent in order, one beat per step when
//! allowed. Once a beat has been presented it is held, unchanged, until the
//! multiplexer accepts it: valid is never withdrawn mid-handshake. The
//! stall pattern only decides whether the *next* beat is presented, which
//! inserts idle steps between beats.

use std::collections::VecDeque;

use packet_mux_core::{Beat, Channel};

use crate::{
    packet::Packet,
    signal::{SignalDriver, SignalPattern},
    sim_env::SimEnv,
};

/// Bus-functional source for one channel.
#[derive(Debug, Clone)]
pub struct Source {
    channel: Channel,
    valid: SignalDriver,
    pending: VecDeque<Beat>,
    presenting: Option<Beat>,
    queued: Vec<Beat>,
    accepted: Vec<Beat>,
    packets: Vec<Packet>,
}

impl Source {
    /// Source that presents a beat whenever it has one.
    pub fn new(channel: Channel) -> Self {
        Self::with_pattern(channel, SignalPattern::Always)
    }

    /// Source whose willingness to present a new beat follows `pattern`.
    pub fn with_pattern(channel: Channel, pattern: SignalPattern) -> Self {
        Self {
            channel,
            valid: SignalDriver::new(pattern),
            pending: VecDeque::new(),
            presenting: None,
            queued: Vec::new(),
            accepted: Vec::new(),
            packets: Vec::new(),
        }
    }

    /// Channel this source drives.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Queue a packet behind everything already queued.
    pub fn queue_packet(&mut self, packet: Packet) {
        let beats = packet.beats();
        self.queued.extend_from_slice(&beats);
        self.pending.extend(beats);
        self.packets.push(packet);
    }

    /// Queue raw beats, bypassing packet framing.
    ///
    /// Used to drive malformed traffic such as a beat without
    /// `start_of_frame`.
    pub fn queue_beats(&mut self, beats: impl IntoIterator<Item = Beat>) {
        for beat in beats {
            self.queued.push(beat);
            self.pending.push_back(beat);
        }
    }

    /// Beat presented this step.
    pub fn offer(&mut self, env: &mut SimEnv) -> Option<Beat> {
        if self.presenting.is_none() && !self.pending.is_empty() && self.valid.next(env) {
            self.presenting = self.pending.pop_front();
        }
        self.presenting
    }

    /// Finish the step given the ready the multiplexer returned.
    ///
    /// Returns the beat transferred this step, if any.
    pub fn complete(&mut self, ready: bool) -> Option<Beat> {
        if !ready {
            return None;
        }
        let beat = self.presenting.take()?;
        self.accepted.push(beat);
        Some(beat)
    }

    /// Drop queued traffic and history. The valid pattern keeps its position.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.presenting = None;
        self.queued.clear();
        self.accepted.clear();
        self.packets.clear();
    }

    /// Whether nothing is left to send.
    pub fn is_idle(&self) -> bool {
        self.presenting.is_none() && self.pending.is_empty()
    }

    /// Beats not yet accepted by the multiplexer.
    pub fn backlog(&self) -> usize {
        self.pending.len() + usize::from(self.presenting.is_some())
    }

    /// Every beat ever queued, in order.
    pub fn queued(&self) -> &[Beat] {
        &self.queued
    }

    /// Beats accepted by the multiplexer, in order.
    pub fn accepted(&self) -> &[Beat] {
        &self.accepted
    }

    /// Packets queued through [`Source::queue_packet`], in order.
    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }
}
