//! Oracle helpers.
//!
//! Each helper returns an [`OracleFn`] checking one property of a finished
//! [`World`]. Compose them with [`all_of`].

use packet_mux_core::{ArbiterState, Channel};

use crate::scenario::{OracleFn, World};

/// Every queued beat was delivered exactly once, unmodified and in order,
/// on the channel it was queued on.
pub fn all_delivered() -> OracleFn {
    Box::new(|world: &World| {
        for channel in [Channel::A, Channel::B] {
            let queued = world.source(channel).queued();
            let delivered = world.sink().delivered_from(channel);

            if delivered.len() != queued.len() {
                return Err(format!(
                    "channel {channel}: queued {} beats, delivered {}",
                    queued.len(),
                    delivered.len()
                ));
            }
            if let Some(i) = queued.iter().zip(&delivered).position(|(q, d)| q != d) {
                return Err(format!(
                    "channel {channel}: beat {i} differs: queued {:?}, delivered {:?}",
                    queued[i], delivered[i]
                ));
            }
        }
        Ok(())
    })
}

/// Every queued packet was reassembled at the output with its payload,
/// `empty` and `error` intact.
pub fn packets_intact() -> OracleFn {
    Box::new(|world: &World| {
        for channel in [Channel::A, Channel::B] {
            let sent = world.source(channel).packets();
            let received = world.sink().packets_from(channel);

            if sent.len() != received.len() {
                return Err(format!(
                    "channel {channel}: sent {} packets, received {}",
                    sent.len(),
                    received.len()
                ));
            }
            for (i, (s, r)) in sent.iter().zip(received).enumerate() {
                if s != r {
                    return Err(format!("channel {channel}: packet {i} differs: sent {s:?}, got {r:?}"));
                }
            }
        }
        Ok(())
    })
}

/// No beat from the other channel appears between a multi-beat frame's
/// first and last beat.
pub fn packets_atomic() -> OracleFn {
    Box::new(|world: &World| {
        let mut open: Option<Channel> = None;

        for (cycle, channel, beat) in world.trace().deliveries() {
            if let Some(owner) = open {
                if owner != channel {
                    return Err(format!(
                        "cycle {cycle}: beat from {channel} inside a frame from {owner}"
                    ));
                }
            }
            if beat.opens_multi_beat_frame() {
                open = Some(channel);
            }
            if beat.end_of_frame {
                open = None;
            }
        }
        Ok(())
    })
}

/// Whenever the arbiter was idle with both inputs holding data, A was
/// granted.
pub fn priority_respected() -> OracleFn {
    Box::new(|world: &World| {
        for step in world.trace().steps() {
            let contested = step.state == ArbiterState::Idle && step.a_valid && step.b_valid;
            if contested && step.grant != Some(Channel::A) {
                return Err(format!(
                    "cycle {}: both channels pending while idle, granted {:?}",
                    step.cycle, step.grant
                ));
            }
        }
        Ok(())
    })
}

/// Queue occupancy stayed at or below its almost-full threshold, and so
/// never reached capacity.
pub fn queue_bounded() -> OracleFn {
    Box::new(|world: &World| {
        let config = world.mux().config();
        let seen = world.mux().queue_high_watermark().max(world.trace().max_queue_len());

        if seen > config.almost_full_threshold() || seen >= config.queue_capacity {
            return Err(format!(
                "queue reached {seen} (threshold {}, capacity {})",
                config.almost_full_threshold(),
                config.queue_capacity
            ));
        }
        Ok(())
    })
}

/// Every beat delivered while locked came from the locked channel.
pub fn grant_follows_lock() -> OracleFn {
    Box::new(|world: &World| {
        for step in world.trace().steps() {
            if let Some(owner) = step.state.locked_to() {
                if step.grant != Some(owner) {
                    return Err(format!(
                        "cycle {}: locked to {owner} but granted {:?}",
                        step.cycle, step.grant
                    ));
                }
            }
        }
        Ok(())
    })
}

/// The simulation finished with nothing left anywhere.
pub fn drained() -> OracleFn {
    Box::new(|world: &World| {
        if world.is_idle() && !world.sink().in_packet() {
            Ok(())
        } else {
            Err(format!("{} beats still outstanding", world.backlog()))
        }
    })
}

/// Run every oracle, failing on the first error.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world: &World| {
        for oracle in &oracles {
            oracle(world)?;
        }
        Ok(())
    })
}

/// Every property the multiplexer guarantees.
pub fn standard() -> OracleFn {
    all_of(vec![
        drained(),
        all_delivered(),
        packets_intact(),
        packets_atomic(),
        priority_respected(),
        grant_follows_lock(),
        queue_bounded(),
    ])
}
