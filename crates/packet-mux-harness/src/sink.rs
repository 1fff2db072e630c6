//! Output monitor.
//!
//! Drives the output port's ready from a [`SignalPattern`] and reassembles
//! transferred beats into packets. A beat with `start_of_frame` opens a new
//! packet; a beat with `end_of_frame` closes it and records the packet's
//! `empty` and `error` metadata. Beats outside a packet are counted as
//! stray and otherwise ignored.

use packet_mux_core::{Beat, Channel};

use crate::{
    packet::Packet,
    signal::{SignalDriver, SignalPattern},
    sim_env::SimEnv,
};

/// A packet reassembled at the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPacket {
    /// Channel the packet came from
    pub channel: Channel,
    /// Payload and metadata
    pub packet: Packet,
    /// Step on which the last beat was transferred
    pub completed_at: u64,
}

/// Output port monitor
#[derive(Debug, Clone)]
pub struct Sink {
    ready: SignalDriver,
    delivered: Vec<(Channel, Beat)>,
    packets: Vec<ReceivedPacket>,
    current: Option<(Channel, Vec<u64>)>,
    stray_beats: usize,
}

impl Default for Sink {
    fn default() -> Self {
        Self::new(SignalPattern::Always)
    }
}

impl Sink {
    /// Sink whose ready follows `pattern`.
    pub fn new(pattern: SignalPattern) -> Self {
        Self {
            ready: SignalDriver::new(pattern),
            delivered: Vec::new(),
            packets: Vec::new(),
            current: None,
            stray_beats: 0,
        }
    }

    /// Ready level for this step.
    pub fn ready(&mut self, env: &mut SimEnv) -> bool {
        self.ready.next(env)
    }

    /// Record the outcome of a step.
    pub fn observe(&mut self, cycle: u64, grant: Option<Channel>, delivered: Option<Beat>) {
        let (Some(beat), Some(channel)) = (delivered, grant) else {
            return;
        };
        self.delivered.push((channel, beat));

        if beat.start_of_frame {
            if self.current.is_some() {
                tracing::warn!(cycle, %channel, "start of frame inside an open packet");
            }
            self.current = Some((channel, Vec::new()));
        }

        match self.current.as_mut() {
            Some((_, words)) => words.push(beat.data),
            None => {
                self.stray_beats += 1;
                return;
            },
        }

        if beat.end_of_frame {
            if let Some((opened_on, words)) = self.current.take() {
                self.packets.push(ReceivedPacket {
                    channel: opened_on,
                    packet: Packet { words, empty: beat.empty, error: beat.error },
                    completed_at: cycle,
                });
            }
        }
    }

    /// Every transferred beat with its source channel, in output order.
    pub fn delivered(&self) -> &[(Channel, Beat)] {
        &self.delivered
    }

    /// Transferred beats from one channel, in output order.
    pub fn delivered_from(&self, channel: Channel) -> Vec<Beat> {
        self.delivered.iter().filter(|(c, _)| *c == channel).map(|(_, b)| *b).collect()
    }

    /// Completed packets in output order.
    pub fn packets(&self) -> &[ReceivedPacket] {
        &self.packets
    }

    /// Completed packets from one channel.
    pub fn packets_from(&self, channel: Channel) -> Vec<&Packet> {
        self.packets.iter().filter(|p| p.channel == channel).map(|p| &p.packet).collect()
    }

    /// Beats transferred outside any packet.
    pub fn stray_beats(&self) -> usize {
        self.stray_beats
    }

    /// Forget everything observed. The ready pattern keeps its position.
    pub fn clear(&mut self) {
        self.delivered.clear();
        self.packets.clear();
        self.current = None;
        self.stray_beats = 0;
    }

    /// Whether a packet has started but not finished.
    pub fn in_packet(&self) -> bool {
        self.current.is_some()
    }
}
