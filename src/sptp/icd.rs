//! ICD header which follows the SPTP header of ICD frames.
//!
//! The header consists of one packed 32 bit word followed by the 16 bit size field. The word
//! fields are listed from the most significant bit:
//!
//! | Bits   | Field                                        |
//! |--------|----------------------------------------------|
//! | 31..29 | Version                                      |
//! | 28     | Type (TK: 1, TM: 0)                          |
//! | 27     | Header flag (header fill: 1, empty: 0)       |
//! | 26..16 | APID, 3 high bits and 8 low bits             |
//! | 15..14 | Segment flags                                |
//! | 13..0  | Counter, 6 high bits and 8 low bits          |
//!
//! The size field is stored byte swapped relative to a little endian read, which means it is big
//! endian on the wire.
use crate::sptp::SptpPacket;
use crate::{ByteConversionError, MAX_APID, MAX_SEQ_COUNT};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Length of the ICD header including the size field.
pub const ICD_HEADER_LEN: usize = core::mem::size_of::<zc::IcdHeader>();

/// Shift and mask helpers for the packed ICD header word.
pub mod field {
    #[inline]
    pub const fn version(word: u32) -> u8 {
        ((word >> 29) & 0b111) as u8
    }

    #[inline]
    pub const fn icd_type(word: u32) -> u8 {
        ((word >> 28) & 0b1) as u8
    }

    #[inline]
    pub const fn header_flag(word: u32) -> u8 {
        ((word >> 27) & 0b1) as u8
    }

    #[inline]
    pub const fn apid_hi(word: u32) -> u8 {
        ((word >> 24) & 0b111) as u8
    }

    #[inline]
    pub const fn apid_lo(word: u32) -> u8 {
        ((word >> 16) & 0xFF) as u8
    }

    #[inline]
    pub const fn apid(word: u32) -> u16 {
        ((apid_hi(word) as u16) << 8) | apid_lo(word) as u16
    }

    #[inline]
    pub const fn segment(word: u32) -> u8 {
        ((word >> 14) & 0b11) as u8
    }

    #[inline]
    pub const fn counter_hi(word: u32) -> u8 {
        ((word >> 8) & 0b11_1111) as u8
    }

    #[inline]
    pub const fn counter_lo(word: u32) -> u8 {
        (word & 0xFF) as u8
    }

    #[inline]
    pub const fn counter(word: u32) -> u16 {
        ((counter_hi(word) as u16) << 8) | counter_lo(word) as u16
    }

    /// Convert the size field as read in little endian order into its value.
    #[inline]
    pub const fn size(stored: u16) -> u16 {
        stored.swap_bytes()
    }

    /// Pack the header word. Values are masked to their field widths.
    pub const fn pack(
        version: u8,
        icd_type: u8,
        header_flag: u8,
        apid: u16,
        segment: u8,
        counter: u16,
    ) -> u32 {
        (((version & 0b111) as u32) << 29)
            | (((icd_type & 0b1) as u32) << 28)
            | (((header_flag & 0b1) as u32) << 27)
            | (((apid & 0x7FF) as u32) << 16)
            | (((segment & 0b11) as u32) << 14)
            | (counter & 0x3FFF) as u32
    }
}

/// ICD frame type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IcdType {
    /// Telemetry
    Tm = 0,
    /// Telecommand
    Tk = 1,
}

impl From<u8> for IcdType {
    fn from(value: u8) -> Self {
        match value & 0b1 {
            0 => IcdType::Tm,
            _ => IcdType::Tk,
        }
    }
}

/// Secondary header flag of the ICD header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderFlag {
    HeaderEmpty = 0,
    HeaderFill = 1,
}

impl From<u8> for HeaderFlag {
    fn from(value: u8) -> Self {
        match value & 0b1 {
            0 => HeaderFlag::HeaderEmpty,
            _ => HeaderFlag::HeaderFill,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SegmentFlags {
    ContinuationSegment = 0b00,
    FirstSegment = 0b01,
    LastSegment = 0b10,
    Unsegmented = 0b11,
}

impl From<u8> for SegmentFlags {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => SegmentFlags::ContinuationSegment,
            0b01 => SegmentFlags::FirstSegment,
            0b10 => SegmentFlags::LastSegment,
            _ => SegmentFlags::Unsegmented,
        }
    }
}

/// Decoded ICD header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IcdHeader {
    pub version: u8,
    pub icd_type: IcdType,
    pub header_flag: HeaderFlag,
    apid: u16,
    pub segment: SegmentFlags,
    counter: u16,
    pub size: u16,
}

impl IcdHeader {
    /// Create a new header. Returns [None] if the APID or counter exceed [MAX_APID] or
    /// [MAX_SEQ_COUNT] respectively.
    pub fn new(
        icd_type: IcdType,
        header_flag: HeaderFlag,
        apid: u16,
        counter: u16,
        size: u16,
    ) -> Option<Self> {
        if apid > MAX_APID || counter > MAX_SEQ_COUNT {
            return None;
        }
        Some(Self {
            version: 0,
            icd_type,
            header_flag,
            apid,
            segment: SegmentFlags::Unsegmented,
            counter,
            size,
        })
    }

    /// Header of an outbound telecommand frame.
    pub fn tk(apid: u16, counter: u16, size: u16) -> Option<Self> {
        Self::new(IcdType::Tk, HeaderFlag::HeaderFill, apid, counter, size)
    }

    pub fn from_word(word: u32, size: u16) -> Self {
        Self {
            version: field::version(word),
            icd_type: IcdType::from(field::icd_type(word)),
            header_flag: HeaderFlag::from(field::header_flag(word)),
            apid: field::apid(word),
            segment: SegmentFlags::from(field::segment(word)),
            counter: field::counter(word),
            size,
        }
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, ByteConversionError> {
        zc::IcdHeader::from_bytes(buf)
            .map(Self::from)
            .ok_or(ByteConversionError::FromSliceTooSmall {
                found: buf.len(),
                expected: ICD_HEADER_LEN,
            })
    }

    /// Caller guarantees that `buf` holds at least [ICD_HEADER_LEN] bytes.
    pub(crate) fn read(buf: &[u8]) -> Self {
        let word = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        Self::from_word(word, field::size(u16::from_le_bytes([buf[4], buf[5]])))
    }

    pub fn write_to_bytes(&self, buf: &mut [u8]) -> Result<usize, ByteConversionError> {
        zc::IcdHeader::from(*self)
            .to_bytes(buf)
            .ok_or(ByteConversionError::ToSliceTooSmall {
                found: buf.len(),
                expected: ICD_HEADER_LEN,
            })?;
        Ok(ICD_HEADER_LEN)
    }

    #[inline]
    pub fn apid(&self) -> u16 {
        self.apid
    }

    #[inline]
    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Packed header word.
    pub fn word(&self) -> u32 {
        field::pack(
            self.version,
            self.icd_type as u8,
            self.header_flag as u8,
            self.apid,
            self.segment as u8,
            self.counter,
        )
    }

    /// Structural check shared by the TK, TM and OBT classification: version 0 with the given
    /// type and header flag.
    #[inline]
    pub fn is(&self, icd_type: IcdType, header_flag: HeaderFlag) -> bool {
        self.version == 0 && self.icd_type == icd_type && self.header_flag == header_flag
    }
}

impl From<zc::IcdHeader> for IcdHeader {
    fn from(value: zc::IcdHeader) -> Self {
        Self::from_word(value.word.get(), value.size.get())
    }
}

/// Generic trait to access the ICD header fields of a frame.
pub trait IcdPacket: SptpPacket {
    fn icd_header(&self) -> &IcdHeader;

    #[inline]
    fn version(&self) -> u8 {
        self.icd_header().version
    }

    #[inline]
    fn icd_type(&self) -> IcdType {
        self.icd_header().icd_type
    }

    #[inline]
    fn header_flag(&self) -> HeaderFlag {
        self.icd_header().header_flag
    }

    #[inline]
    fn apid(&self) -> u16 {
        self.icd_header().apid
    }

    #[inline]
    fn segment(&self) -> SegmentFlags {
        self.icd_header().segment
    }

    #[inline]
    fn counter(&self) -> u16 {
        self.icd_header().counter
    }

    #[inline]
    fn size(&self) -> u16 {
        self.icd_header().size
    }

    #[inline]
    fn is_tk(&self) -> bool {
        self.icd_type() == IcdType::Tk
    }

    #[inline]
    fn is_tm(&self) -> bool {
        self.icd_type() == IcdType::Tm
    }
}

pub mod zc {
    use zerocopy::byteorder::{NetworkEndian, U16, U32};
    use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

    #[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Debug, Copy, Clone)]
    #[repr(C)]
    pub struct IcdHeader {
        pub(super) word: U32<NetworkEndian>,
        pub(super) size: U16<NetworkEndian>,
    }

    impl IcdHeader {
        pub fn from_bytes(slice: &[u8]) -> Option<Self> {
            Self::read_from_prefix(slice)
        }

        pub fn to_bytes(&self, slice: &mut [u8]) -> Option<()> {
            self.write_to_prefix(slice)
        }
    }

    impl From<super::IcdHeader> for IcdHeader {
        fn from(value: super::IcdHeader) -> Self {
            Self {
                word: U32::new(value.word()),
                size: U16::new(value.size),
            }
        }
    }
}
