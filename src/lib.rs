//! # SPTP link and sensor interface decoding
//!
//! This crate contains the protocol decoding layer of the instrument ground support equipment.
//! It consumes address tagged byte fragments, which were already demultiplexed from the USB
//! transport, and turns them into typed and validated protocol messages for two independent
//! wire formats:
//!
//!  - The SpaceWire link: frames using the SPTP credit flow header, optionally followed by an
//!    ICD header which layers version, type, APID, segment and counter fields on top. The
//!    [sptp::Frame] enumeration covers the SPTP, ICD, OBT, TM and TK variants. The
//!    [sptp::decoder::SpaceLinkDecoder] reassembles frames from fragments and classifies them.
//!  - The sensor interface: sync byte and length prefixed frames decoded by the
//!    [sensor::SensorDecoder] state machine.
//!
//! The [crc] and [seq_count] modules contain the checksum and the per-APID sequence counter
//! table used for both inbound verification and outbound telecommand construction.
//!
//! ## Features
//!
//! `sptp-link` is `no_std` and only requires an allocator.
//!
//! Default features:
//!
//!  - [`std`](https://doc.rust-lang.org/std/): Enables functionality relying on the standard
//!    library, for example `std::error::Error` implementations via `thiserror`.
//!
//! Optional features:
//!
//!  - [`serde`](https://serde.rs/): Derives serialization support for headers, enumerations and
//!    the decoder configuration structures.
//!  - [`defmt`](https://defmt.ferrous-systems.com/): Derives `defmt::Format` for plain
//!    enumerations.
//!
//! ## Example
//!
//! ```rust
//! use sptp_link::fragment::Fragment;
//! use sptp_link::seq_count::ApidCounterTable;
//! use sptp_link::sptp::decoder::{SpaceLinkAddresses, SpaceLinkDecoder, SpaceLinkEvent};
//! use sptp_link::sptp::{Frame, TkFrame};
//!
//! let mut counters = ApidCounterTable::default();
//! let raw = TkFrame::build(&[1, 2, 3, 4], 0x20, 0x21, 0x42, &mut counters).unwrap();
//!
//! let mut decoder = SpaceLinkDecoder::new(SpaceLinkAddresses::new(0x100, 0x101, 0x102, 0x103));
//! assert!(decoder.handle(&Fragment::new(0x100, &raw)).is_none());
//! match decoder.handle(&Fragment::new(0x101, &[0])) {
//!     Some(SpaceLinkEvent::Frame(received)) => {
//!         assert!(matches!(received.frame, Frame::Tk(_)));
//!     }
//!     _ => panic!("expected a decoded frame"),
//! }
//! ```
#![no_std]
#![cfg_attr(doc_cfg, feature(doc_cfg))]
extern crate alloc;
#[cfg(any(feature = "std", test))]
extern crate std;

pub mod crc;
pub mod fragment;
pub mod sensor;
pub mod seq_count;
pub mod sptp;

pub use fragment::{Event, Fragment, FragmentBus, FragmentHandler};

/// Maximum value of the 11 bit APID field.
pub const MAX_APID: u16 = 2u16.pow(11) - 1;
/// Maximum value of the 14 bit sequence counter field.
pub const MAX_SEQ_COUNT: u16 = 2u16.pow(14) - 1;

/// Generic error type when converting to and from raw byte slices.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ByteConversionError {
    /// The passed slice is too small. Returns the passed slice length and expected minimum size
    #[error("target slice with size {found} is too small, expected size of at least {expected}")]
    ToSliceTooSmall { found: usize, expected: usize },
    /// The provider buffer is too small. Returns the passed slice length and expected minimum size
    #[error("source slice with size {found} too small, expected at least {expected} bytes")]
    FromSliceTooSmall { found: usize, expected: usize },
}
