use crate::MAX_SEQ_COUNT;
use alloc::collections::BTreeMap;
use core::cell::Cell;

/// Core trait for objects which can provide a sequence count.
///
/// The core functions are not mutable on purpose to allow easier usage with
/// static structs when using the interior mutability pattern. This can be achieved by using
/// [Cell], [core::cell::RefCell] or atomic types.
pub trait SequenceCountProvider {
    type Raw: Into<u64>;
    const MAX_BIT_WIDTH: usize;

    fn get(&self) -> Self::Raw;

    fn increment(&self);

    fn get_and_increment(&self) -> Self::Raw {
        let val = self.get();
        self.increment();
        val
    }

    /// Increment the counter and return the new value.
    fn increment_and_get(&self) -> Self::Raw {
        self.increment();
        self.get()
    }
}

/// This is a sequence count provider which wraps around at [MAX_SEQ_COUNT], which matches the
/// 14 bit counter field of the ICD header.
#[derive(Debug, Clone, Default)]
pub struct CcsdsSimpleSeqCountProvider {
    seq_count: Cell<u16>,
}

impl CcsdsSimpleSeqCountProvider {
    pub fn new(start: u16) -> Self {
        Self {
            seq_count: Cell::new(start & MAX_SEQ_COUNT),
        }
    }
}

impl SequenceCountProvider for CcsdsSimpleSeqCountProvider {
    type Raw = u16;
    const MAX_BIT_WIDTH: usize = 14;

    fn get(&self) -> u16 {
        self.seq_count.get()
    }

    fn increment(&self) {
        let curr_count = self.seq_count.get();
        if curr_count >= MAX_SEQ_COUNT {
            self.seq_count.set(0);
        } else {
            self.seq_count.set(curr_count + 1);
        }
    }
}

/// Per-APID counter table used when building outbound telecommand frames.
///
/// Each APID owns an independent [CcsdsSimpleSeqCountProvider]. An entry is created at 0 the
/// first time its APID is requested, so the first frame of every APID carries the counter
/// value 1.
#[derive(Debug, Clone, Default)]
pub struct ApidCounterTable {
    counters: BTreeMap<u16, CcsdsSimpleSeqCountProvider>,
}

impl ApidCounterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter of `apid` and return the new value, truncated to 14 bits.
    pub fn next(&mut self, apid: u16) -> u16 {
        self.counters
            .entry(apid)
            .or_default()
            .increment_and_get()
    }

    /// Current value for `apid` without modifying the table. Returns [None] if no frame was
    /// built for this APID yet.
    pub fn current(&self, apid: u16) -> Option<u16> {
        self.counters.get(&apid).map(|counter| counter.get())
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
