//! CRC16 used by the ICD telecommand frames.
//!
//! The link uses the CCSDS CRC-16/CCITT-FALSE algorithm: polynomial 0x1021, initial value 0xFFFF,
//! no reflection and no final XOR. The check value for the ASCII string `123456789` is 0x29B1.

/// CRC algorithm used by the ICD frames, using a [crc::NoTable] as the CRC implementation.
pub const CRC_CCITT_FALSE_NO_TABLE: crc::Crc<u16, crc::NoTable> =
    crc::Crc::<u16, crc::NoTable>::new(&crc::CRC_16_IBM_3740);
/// CRC algorithm used by the ICD frames, using [crc::Table<1>] as the CRC implementation.
pub const CRC_CCITT_FALSE: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_IBM_3740);

/// Calculate the CRC16 over the window of `len` bytes starting at `start`.
///
/// The window is clamped to the buffer, so a window reaching past the end of `buf` only covers
/// the bytes which are actually present.
pub fn crc16(buf: &[u8], start: usize, len: usize) -> u16 {
    let start = start.min(buf.len());
    let end = start.saturating_add(len).min(buf.len());
    CRC_CCITT_FALSE.checksum(&buf[start..end])
}
