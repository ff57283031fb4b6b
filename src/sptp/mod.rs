//! # SPTP credit flow frames
//!
//! Every frame on the SpaceWire link starts with the 4 byte SPTP header:
//!
//! | Byte | Field         |
//! |------|---------------|
//! | 0    | To            |
//! | 1    | Protocol ID   |
//! | 2    | Message type  |
//! | 3    | From          |
//!
//! The [icd] module contains the ICD header which follows the SPTP header for ICD frames and the
//! [frame] module contains the frame variants and the structural classification. The
//! [decoder] module reassembles and classifies frames from address tagged fragments.
use crate::ByteConversionError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod decoder;
pub mod frame;
pub mod icd;

pub use frame::{
    ErrorFrame, Frame, FrameError, FrameKind, IcdFrame, ObtFrame, SptpFrame, TkFrame, TmFrame,
};
pub use icd::{HeaderFlag, IcdHeader, IcdPacket, IcdType, SegmentFlags};

/// Length of the SPTP header.
pub const SPTP_HEADER_LEN: usize = core::mem::size_of::<zc::SptpHeader>();
/// Protocol ID written into outbound telecommand frames.
pub const TK_PROTOCOL_ID: u8 = 0xF2;

/// SPTP message type field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MsgType {
    Data = 0x00,
    Request = 0x80,
    Reply = 0xC0,
}

/// Decoded SPTP header.
///
/// The message type is kept in its raw form because frames with unknown message types are still
/// valid SPTP frames. Use [SptpHeader::msg_type] to get the typed value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SptpHeader {
    pub to: u8,
    pub protocol_id: u8,
    pub msg_type_raw: u8,
    pub from: u8,
}

impl SptpHeader {
    pub fn new(to: u8, protocol_id: u8, msg_type: MsgType, from: u8) -> Self {
        Self {
            to,
            protocol_id,
            msg_type_raw: msg_type.into(),
            from,
        }
    }

    /// Typed message type. Returns the raw value as the error for unknown message types.
    pub fn msg_type(&self) -> Result<MsgType, u8> {
        MsgType::try_from(self.msg_type_raw).map_err(|e| e.number)
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, ByteConversionError> {
        zc::SptpHeader::from_bytes(buf)
            .map(Self::from)
            .ok_or(ByteConversionError::FromSliceTooSmall {
                found: buf.len(),
                expected: SPTP_HEADER_LEN,
            })
    }

    /// Caller guarantees that `buf` holds at least [SPTP_HEADER_LEN] bytes.
    pub(crate) fn read(buf: &[u8]) -> Self {
        Self {
            to: buf[0],
            protocol_id: buf[1],
            msg_type_raw: buf[2],
            from: buf[3],
        }
    }

    pub fn write_to_bytes(&self, buf: &mut [u8]) -> Result<usize, ByteConversionError> {
        if buf.len() < SPTP_HEADER_LEN {
            return Err(ByteConversionError::ToSliceTooSmall {
                found: buf.len(),
                expected: SPTP_HEADER_LEN,
            });
        }
        buf[0] = self.to;
        buf[1] = self.protocol_id;
        buf[2] = self.msg_type_raw;
        buf[3] = self.from;
        Ok(SPTP_HEADER_LEN)
    }
}

impl From<zc::SptpHeader> for SptpHeader {
    fn from(value: zc::SptpHeader) -> Self {
        Self {
            to: value.to,
            protocol_id: value.protocol_id,
            msg_type_raw: value.msg_type,
            from: value.from,
        }
    }
}

/// Generic trait to access the SPTP header fields of any frame carrying one.
pub trait SptpPacket {
    fn sptp_header(&self) -> &SptpHeader;

    /// All bytes of the frame, including all headers.
    fn raw(&self) -> &[u8];

    #[inline]
    fn to(&self) -> u8 {
        self.sptp_header().to
    }

    #[inline]
    fn from(&self) -> u8 {
        self.sptp_header().from
    }

    #[inline]
    fn protocol_id(&self) -> u8 {
        self.sptp_header().protocol_id
    }

    #[inline]
    fn msg_type(&self) -> Result<MsgType, u8> {
        self.sptp_header().msg_type()
    }

    #[inline]
    fn len_frame(&self) -> usize {
        self.raw().len()
    }
}

pub mod zc {
    use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

    /// Zero-copy view of the SPTP header.
    #[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Debug, Copy, Clone)]
    #[repr(C)]
    pub struct SptpHeader {
        pub(super) to: u8,
        pub(super) protocol_id: u8,
        pub(super) msg_type: u8,
        pub(super) from: u8,
    }

    impl SptpHeader {
        pub fn from_bytes(slice: &[u8]) -> Option<Self> {
            Self::read_from_prefix(slice)
        }

        pub fn to_bytes(&self, slice: &mut [u8]) -> Option<()> {
            self.write_to_prefix(slice)
        }
    }

    impl From<super::SptpHeader> for SptpHeader {
        fn from(value: super::SptpHeader) -> Self {
            Self {
                to: value.to,
                protocol_id: value.protocol_id,
                msg_type: value.msg_type_raw,
                from: value.from,
            }
        }
    }
}
