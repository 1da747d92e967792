//! Unsigned LEB128 varints.
//!
//! Each byte carries 7 value bits, least significant group first; the high
//! bit is set on every byte except the last. A `u64` needs at most 10 bytes.

use std::io::{self, Read};

use crate::{Error, Result};

/// Maximum number of bytes a u64 varint can occupy.
pub const MAX_VARINT_LEN: usize = 10;

/// Decode a varint from the start of `buf`.
///
/// Returns `(value, bytes_consumed)`. An exhausted buffer and an encoding
/// longer than [`MAX_VARINT_LEN`] are both reported as
/// [`Error::MalformedVarint`], never as a zero-length success.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        value = accumulate(value, byte, i)?;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(Error::MalformedVarint)
}

/// Decode a varint byte by byte from a reader.
///
/// End of stream before the terminating byte is [`Error::MalformedVarint`];
/// other IO failures pass through.
pub fn read_varint<R: Read + ?Sized>(reader: &mut R) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut byte = [0u8; 1];
    for i in 0..MAX_VARINT_LEN {
        match reader.read_exact(&mut byte) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(Error::MalformedVarint)
            }
            Err(e) => return Err(e.into()),
        }
        value = accumulate(value, byte[0], i)?;
        if byte[0] & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(Error::MalformedVarint)
}

#[inline]
fn accumulate(value: u64, byte: u8, index: usize) -> Result<u64> {
    let payload = (byte & 0x7F) as u64;
    // The 10th byte only has room for the top bit of a u64.
    if index == MAX_VARINT_LEN - 1 && payload > 1 {
        return Err(Error::MalformedVarint);
    }
    Ok(value | payload << (7 * index))
}

/// Append `value` to `buf` as a varint, returning the bytes written.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) -> usize {
    let start = buf.len();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return buf.len() - start;
        }
        buf.push(byte | 0x80);
    }
}

/// Number of bytes `value` occupies once encoded.
pub fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}
