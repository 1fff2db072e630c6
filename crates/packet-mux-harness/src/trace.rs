//! Per-step simulation record.
//!
//! A [`Trace`] keeps one [`StepRecord`] per clock step: the handshake
//! signals on all three ports and the internal state sampled before the
//! step. Oracles check properties against it, and it can be written out as
//! CBOR for offline inspection or comparison between runs.

use std::io::{Read, Write};

use packet_mux_core::{ArbiterState, Beat, Channel, MuxInputs, MuxOutputs};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Signals and state of one clock step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step number
    pub cycle: u64,
    /// Arbiter state before the step
    pub state: ArbiterState,
    /// Arbiter input A had data
    pub a_valid: bool,
    /// Arbiter input B had data
    pub b_valid: bool,
    /// Buffer A held a parked beat before the step
    pub a_buffered: bool,
    /// Buffer B held a parked beat before the step
    pub b_buffered: bool,
    /// Queue occupancy before the step
    pub queue_len: usize,
    /// Beat offered by source A
    pub a_offered: Option<Beat>,
    /// Beat offered by source B
    pub b_offered: Option<Beat>,
    /// Ready returned to source A
    pub a_ready: bool,
    /// Ready returned to source B
    pub b_ready: bool,
    /// Downstream ready
    pub out_ready: bool,
    /// Beat presented on the output, whether or not it was taken
    pub presented: Option<Beat>,
    /// Channel granted the output
    pub grant: Option<Channel>,
    /// Beat transferred on the output
    pub delivered: Option<Beat>,
}

impl StepRecord {
    /// Build a record from one step's inputs and outputs.
    pub fn new(cycle: u64, inputs: &MuxInputs, outputs: &MuxOutputs) -> Self {
        Self {
            cycle,
            state: outputs.probe.state,
            a_valid: outputs.probe.a_valid,
            b_valid: outputs.probe.b_valid,
            a_buffered: outputs.probe.a_buffered,
            b_buffered: outputs.probe.b_buffered,
            queue_len: outputs.probe.queue_len,
            a_offered: inputs.a,
            b_offered: inputs.b,
            a_ready: outputs.a_ready,
            b_ready: outputs.b_ready,
            out_ready: inputs.out_ready,
            presented: outputs.out,
            grant: outputs.grant,
            delivered: outputs.delivered,
        }
    }
}

/// Ordered list of step records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    steps: Vec<StepRecord>,
}

impl Trace {
    /// Empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn record(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    /// All recorded steps.
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Output transfers in order, with their source channel.
    pub fn deliveries(&self) -> impl Iterator<Item = (u64, Channel, Beat)> + '_ {
        self.steps.iter().filter_map(|s| match (s.grant, s.delivered) {
            (Some(channel), Some(beat)) => Some((s.cycle, channel, beat)),
            _ => None,
        })
    }

    /// Highest queue occupancy observed.
    pub fn max_queue_len(&self) -> usize {
        self.steps.iter().map(|s| s.queue_len).max().unwrap_or(0)
    }

    /// Write the trace as CBOR.
    pub fn write_cbor<W: Write>(&self, writer: W) -> Result<(), HarnessError> {
        ciborium::into_writer(self, writer).map_err(|e| HarnessError::TraceEncode(Box::new(e)))
    }

    /// Read a trace written by [`Trace::write_cbor`].
    pub fn read_cbor<R: Read>(reader: R) -> Result<Self, HarnessError> {
        ciborium::from_reader(reader).map_err(|e| HarnessError::TraceDecode(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cycle: u64, grant: Option<Channel>, delivered: Option<Beat>) -> StepRecord {
        StepRecord {
            cycle,
            state: ArbiterState::Idle,
            a_valid: false,
            b_valid: false,
            a_buffered: false,
            b_buffered: false,
            queue_len: cycle as usize,
            a_offered: None,
            b_offered: None,
            a_ready: true,
            b_ready: true,
            out_ready: true,
            presented: delivered,
            grant,
            delivered,
        }
    }

    #[test]
    fn deliveries_skip_idle_steps() {
        let mut trace = Trace::new();
        trace.record(record(0, None, None));
        trace.record(record(1, Some(Channel::A), Some(Beat::single(1))));
        trace.record(record(2, Some(Channel::B), None));

        let deliveries: Vec<_> = trace.deliveries().collect();
        assert_eq!(deliveries, vec![(1, Channel::A, Beat::single(1))]);
        assert_eq!(trace.max_queue_len(), 2);
    }

    #[test]
    fn cbor_file_can_be_read_back() {
        let mut trace = Trace::new();
        trace.record(record(0, Some(Channel::B), Some(Beat::single(3).with_error(true))));
        trace.record(record(1, None, None));

        let mut bytes = Vec::new();
        trace.write_cbor(&mut bytes).unwrap();
        assert_eq!(Trace::read_cbor(bytes.as_slice()).unwrap(), trace);

        assert!(matches!(Trace::read_cbor(&[0xff_u8][..]), Err(HarnessError::TraceDecode(_))));
    }

    #[test]
    fn codec_errors_keep_their_source() {
        use std::error::Error;

        let err = Trace::read_cbor(&[0xff_u8][..]).unwrap_err();
        let source = err.source().expect("decode error should chain the ciborium error");
        assert!(err.to_string().ends_with(&source.to_string()));

        let mut full = [0_u8; 0];
        let mut trace = Trace::new();
        trace.record(record(0, None, None));
        let err = trace.write_cbor(&mut full[..]).unwrap_err();
        assert!(matches!(err, HarnessError::TraceEncode(_)));
        assert!(err.source().is_some());
    }
}
