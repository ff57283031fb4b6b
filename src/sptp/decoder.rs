//! Space link decoder.
//!
//! One decoder instance serves one logical sub-channel of the link, identified by four address
//! tags. Data fragments are appended to a private accumulation buffer. A terminator fragment
//! (EOP or EEP) takes the buffer, classifies it and emits the resulting [Frame] stamped with the
//! latched time tick bytes. Time fragments update the latch and emit a tick right away, without
//! touching the buffer.
use crate::fragment::{Event, Fragment, FragmentHandler};
use crate::sptp::Frame;
use alloc::vec::Vec;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Address tags of one logical sub-channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpaceLinkAddresses {
    pub data: u32,
    /// EOP/EEP marker address.
    pub terminator: u32,
    pub time1: u32,
    pub time2: u32,
}

impl SpaceLinkAddresses {
    pub const fn new(data: u32, terminator: u32, time1: u32, time2: u32) -> Self {
        Self {
            data,
            terminator,
            time1,
            time2,
        }
    }
}

/// Decoder configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpaceLinkConfig {
    pub addresses: SpaceLinkAddresses,
    /// Set by the detector sub-channels. The flag is kept for the callers but does not change
    /// how frames are decoded.
    pub detector_channel: bool,
}

/// Both latched time tick bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeTicks {
    pub time1: u8,
    pub time2: u8,
}

/// Time tick event: the updated latch byte and the current value of the other latch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeTick {
    pub value: u8,
    pub other: u8,
}

/// Frame emitted on a terminator fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub frame: Frame,
    pub time1: u8,
    pub time2: u8,
    /// First byte of the terminator fragment, distinguishing EOP and EEP.
    pub eop: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceLinkEvent {
    Frame(ReceivedFrame),
    TimeTick1(TimeTick),
    TimeTick2(TimeTick),
}

#[derive(Debug, Clone, Default)]
pub struct SpaceLinkDecoder {
    config: SpaceLinkConfig,
    buffer: Vec<u8>,
    ticks: TimeTicks,
}

impl SpaceLinkDecoder {
    pub fn new(addresses: SpaceLinkAddresses) -> Self {
        Self::with_config(SpaceLinkConfig {
            addresses,
            detector_channel: false,
        })
    }

    pub fn with_config(config: SpaceLinkConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            ticks: TimeTicks::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &SpaceLinkConfig {
        &self.config
    }

    #[inline]
    pub fn addresses(&self) -> &SpaceLinkAddresses {
        &self.config.addresses
    }

    #[inline]
    pub fn detector_channel(&self) -> bool {
        self.config.detector_channel
    }

    /// Number of bytes accumulated since the last terminator.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn time_ticks(&self) -> TimeTicks {
        self.ticks
    }

    /// Process one fragment. Fragments with foreign address tags are ignored.
    pub fn handle(&mut self, fragment: &Fragment<'_>) -> Option<SpaceLinkEvent> {
        let addresses = self.config.addresses;
        if fragment.address == addresses.data {
            self.buffer.extend_from_slice(fragment.data());
            trace!(
                address = fragment.address,
                len = fragment.len(),
                buffered = self.buffer.len(),
                "accumulated fragment"
            );
            None
        } else if fragment.address == addresses.terminator {
            Some(SpaceLinkEvent::Frame(
                self.terminate(fragment.first_byte().unwrap_or(0)),
            ))
        } else if fragment.address == addresses.time1 {
            let value = fragment.first_byte().unwrap_or(0);
            self.ticks.time1 = value;
            trace!(value, other = self.ticks.time2, "time tick 1");
            Some(SpaceLinkEvent::TimeTick1(TimeTick {
                value,
                other: self.ticks.time2,
            }))
        } else if fragment.address == addresses.time2 {
            let value = fragment.first_byte().unwrap_or(0);
            self.ticks.time2 = value;
            trace!(value, other = self.ticks.time1, "time tick 2");
            Some(SpaceLinkEvent::TimeTick2(TimeTick {
                value,
                other: self.ticks.time1,
            }))
        } else {
            None
        }
    }

    fn terminate(&mut self, eop: u8) -> ReceivedFrame {
        let raw = core::mem::take(&mut self.buffer);
        let len = raw.len();
        let frame = Frame::decode(raw);
        match &frame {
            Frame::Error(error) => {
                debug!(len, eop, reason = error.message(), "frame classification failed")
            }
            frame => debug!(len, eop, kind = %frame.kind(), "decoded frame"),
        }
        ReceivedFrame {
            frame,
            time1: self.ticks.time1,
            time2: self.ticks.time2,
            eop,
        }
    }
}

impl FragmentHandler for SpaceLinkDecoder {
    fn handle_fragment(&mut self, fragment: &Fragment<'_>, sink: &mut dyn FnMut(Event)) {
        if let Some(event) = self.handle(fragment) {
            sink(Event::SpaceLink(event));
        }
    }
}
