// I/O utilities for reading audio files

use std::io::{Read, Seek, SeekFrom};

/// Largest value a 4-byte syncsafe integer can hold (2^28 - 1)
pub const SYNCSAFE_MAX: u32 = 0x0FFF_FFFF;

/// Read synchsafe 32-bit integer (7 bits per byte)
pub fn read_synchsafe_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut buffer = [0u8; 4];
    reader.read_exact(&mut buffer)?;
    Ok(synchsafe_decode(buffer))
}

pub fn be_u24(bytes: [u8; 3]) -> u32 {
    (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2])
}

/// Only the low 7 bits of each byte carry data, most significant byte first
pub fn synchsafe_decode(bytes: [u8; 4]) -> u32 {
    (u32::from(bytes[0] & 0x7F) << 21)
        | (u32::from(bytes[1] & 0x7F) << 14)
        | (u32::from(bytes[2] & 0x7F) << 7)
        | u32::from(bytes[3] & 0x7F)
}

/// Inverse of [`synchsafe_decode`] for values up to [`SYNCSAFE_MAX`]
pub fn synchsafe_encode(value: u32) -> Option<[u8; 4]> {
    if value > SYNCSAFE_MAX {
        return None;
    }
    Some([
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ])
}

/// Total stream length, leaving the position untouched
pub fn stream_len<R: Seek>(reader: &mut R) -> std::io::Result<u64> {
    let pos = reader.stream_position()?;
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(pos))?;
    Ok(len)
}

/// Read up to `buf.len()` bytes, stopping early only at end of stream
pub fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
