//! # Sensor interface framing
//!
//! Sensor interface frames start with a 4 byte header followed by exactly `size` payload bytes:
//!
//! | Byte | Field                                    |
//! |------|------------------------------------------|
//! | 0    | Sync byte 0xA4                           |
//! | 1    | Flag                                     |
//! | 2    | Line (bit 7), size high bits (bits 6..0) |
//! | 3    | Size low byte                            |
//!
//! The [SensorDecoder] is a strict byte state machine. A byte other than the sync byte in the
//! sync state is counted as an error and the following byte is tried as the sync byte again.
//! There is no scanning ahead.
use crate::fragment::{Event, Fragment, FragmentHandler};
use alloc::vec;
use alloc::vec::Vec;
use tracing::{debug, trace};

pub const SYNC_BYTE: u8 = 0xA4;
pub const SENSOR_HEADER_LEN: usize = 4;
pub const MAX_SENSOR_PAYLOAD: u16 = 0x7FFF;

/// Completed sensor interface frame, header included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorFrame {
    raw: Vec<u8>,
}

impl SensorFrame {
    pub fn flag(&self) -> u8 {
        self.raw[1]
    }

    pub fn line(&self) -> bool {
        (self.raw[2] >> 7) & 0b1 == 1
    }

    pub fn size(&self) -> u16 {
        (((self.raw[2] as u16) << 8) & MAX_SENSOR_PAYLOAD) | self.raw[3] as u16
    }

    pub fn payload(&self) -> &[u8] {
        &self.raw[SENSOR_HEADER_LEN..]
    }

    /// Header and payload bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.raw
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Sync,
    Flag,
    SizeHigh,
    SizeLow,
    Payload,
}

#[derive(Debug, Clone)]
pub struct SensorDecoder {
    address: u32,
    state: State,
    flag: u8,
    size_high: u8,
    size: Option<u16>,
    remaining: usize,
    buffer: Vec<u8>,
    errors: u32,
}

impl SensorDecoder {
    pub fn new(address: u32) -> Self {
        Self {
            address,
            state: State::Sync,
            flag: 0,
            size_high: 0,
            size: None,
            remaining: 0,
            buffer: Vec::new(),
            errors: 0,
        }
    }

    #[inline]
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Number of bytes rejected in the sync state.
    #[inline]
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// Size of the frame currently being collected, [None] while no size was decoded yet.
    #[inline]
    pub fn pending_size(&self) -> Option<u16> {
        self.size
    }

    /// Drop a partially collected frame and clear the error counter.
    pub fn reset(&mut self) {
        self.state = State::Sync;
        self.size = None;
        self.remaining = 0;
        self.buffer.clear();
        self.errors = 0;
    }

    /// Feed a single byte. Returns the frame completed by this byte, if any.
    pub fn push(&mut self, byte: u8) -> Option<SensorFrame> {
        match self.state {
            State::Sync => {
                if byte == SYNC_BYTE {
                    self.state = State::Flag;
                } else {
                    self.errors = self.errors.wrapping_add(1);
                    debug!(
                        address = self.address,
                        byte,
                        errors = self.errors,
                        "sensor sync error"
                    );
                }
                None
            }
            State::Flag => {
                self.flag = byte;
                self.state = State::SizeHigh;
                None
            }
            State::SizeHigh => {
                self.size_high = byte;
                self.state = State::SizeLow;
                None
            }
            State::SizeLow => {
                let size = (((self.size_high as u16) << 8) & MAX_SENSOR_PAYLOAD) | byte as u16;
                self.size = Some(size);
                self.remaining = size as usize;
                self.buffer = vec![0; size as usize + SENSOR_HEADER_LEN];
                self.buffer[..SENSOR_HEADER_LEN].copy_from_slice(&[
                    SYNC_BYTE,
                    self.flag,
                    self.size_high,
                    byte,
                ]);
                self.state = State::Payload;
                self.complete_if_done()
            }
            State::Payload => {
                let idx = self.buffer.len() - self.remaining;
                self.buffer[idx] = byte;
                self.remaining -= 1;
                self.complete_if_done()
            }
        }
    }

    /// Feed a byte slice, passing every completed frame to `sink` in order.
    pub fn push_bytes(&mut self, bytes: &[u8], mut sink: impl FnMut(SensorFrame)) {
        for &byte in bytes {
            if let Some(frame) = self.push(byte) {
                sink(frame);
            }
        }
    }

    /// Feed a byte slice and collect the completed frames.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<SensorFrame> {
        let mut frames = Vec::new();
        self.push_bytes(bytes, |frame| frames.push(frame));
        frames
    }

    fn complete_if_done(&mut self) -> Option<SensorFrame> {
        if self.remaining != 0 {
            return None;
        }
        self.state = State::Sync;
        self.size = None;
        let frame = SensorFrame {
            raw: core::mem::take(&mut self.buffer),
        };
        trace!(
            address = self.address,
            size = frame.size(),
            flag = frame.flag(),
            "sensor frame"
        );
        Some(frame)
    }
}

impl FragmentHandler for SensorDecoder {
    fn handle_fragment(&mut self, fragment: &Fragment<'_>, sink: &mut dyn FnMut(Event)) {
        if fragment.address != self.address {
            return;
        }
        self.push_bytes(fragment.data(), |frame| sink(Event::Sensor(frame)));
    }
}
