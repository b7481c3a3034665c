// ── Message loss estimation ──
//
// Two independent 8-bit rolling counters travel with every Zigbee
// message: the APS counter and the ZCL transaction sequence number.
// Either one can be reset or garbled by a given firmware, so the loss
// estimate for a message is the smaller of the two gaps.

use crate::model::CounterPair;

/// Per-device dual-counter gap estimator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceLossTracker {
    last: Option<CounterPair>,
}

impl SequenceLossTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the counters of the latest message.
    ///
    /// Returns `None` for the first observation (no baseline yet), otherwise
    /// the estimated number of messages lost since the previous one.
    /// Both counters are stored unconditionally.
    pub fn observe(&mut self, counters: CounterPair) -> Option<u8> {
        let miss = self.last.map(|last| {
            let gap_aps = counters.aps.wrapping_sub(last.aps).wrapping_sub(1);
            let gap_zcl = counters.zcl.wrapping_sub(last.zcl).wrapping_sub(1);
            gap_aps.min(gap_zcl)
        });
        self.last = Some(counters);
        miss
    }

    /// Counters from the most recent accepted observation.
    pub fn last(&self) -> Option<CounterPair> {
        self.last
    }
}
