//! Field walker for record payloads.
//!
//! Payloads are sequences of protobuf-style fields: a varint key holding
//! the field number and wire type, then the value. Only the wire types
//! these databases use are understood.

use super::varint::{decode_varint, encode_varint};
use crate::{Error, Result};

pub(crate) const WIRE_VARINT: u64 = 0;
pub(crate) const WIRE_FIXED64: u64 = 1;
pub(crate) const WIRE_LEN: u64 = 2;
pub(crate) const WIRE_FIXED32: u64 = 5;

/// Value of one field.
pub(crate) enum Value<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
    Fixed,
}

/// Cursor over the fields of one message.
pub(crate) struct Fields<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn varint(&mut self) -> Result<u64> {
        let (value, len) = decode_varint(&self.data[self.pos..])?;
        self.pos += len;
        Ok(value)
    }

    fn take(&mut self, len: u64) -> Result<&'a [u8]> {
        let available = self.data.len() - self.pos;
        let len = usize::try_from(len)
            .ok()
            .filter(|&len| len <= available)
            .ok_or(Error::TruncatedRecord {
                needed: usize::try_from(len).unwrap_or(usize::MAX),
                available,
            })?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Next `(field number, value)`, or `None` at the end of the message.
    pub(crate) fn next_field(&mut self) -> Result<Option<(u64, Value<'a>)>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let key = self.varint()?;
        let value = match key & 0x07 {
            WIRE_VARINT => Value::Varint(self.varint()?),
            WIRE_FIXED64 => {
                self.take(8)?;
                Value::Fixed
            }
            WIRE_LEN => {
                let len = self.varint()?;
                Value::Bytes(self.take(len)?)
            }
            WIRE_FIXED32 => {
                self.take(4)?;
                Value::Fixed
            }
            // Groups and reserved wire types never appear in these databases.
            _ => return Err(Error::MalformedVarint),
        };
        Ok(Some((key >> 3, value)))
    }
}

/// Append a varint field.
pub(crate) fn put_varint(out: &mut Vec<u8>, field: u64, value: u64) {
    encode_varint((field << 3) | WIRE_VARINT, out);
    encode_varint(value, out);
}

/// Append a length-delimited field.
pub(crate) fn put_bytes(out: &mut Vec<u8>, field: u64, bytes: &[u8]) {
    encode_varint((field << 3) | WIRE_LEN, out);
    encode_varint(bytes.len() as u64, out);
    out.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_every_wire_type() {
        let mut data = Vec::new();
        put_varint(&mut data, 1, 300);
        put_bytes(&mut data, 2, b"abc");
        data.extend([0x1D, 1, 2, 3, 4]); // field 3, fixed32
        data.extend([0x21, 0, 0, 0, 0, 0, 0, 0, 0]); // field 4, fixed64

        let mut fields = Fields::new(&data);
        assert!(matches!(fields.next_field().unwrap(), Some((1, Value::Varint(300)))));
        assert!(matches!(
            fields.next_field().unwrap(),
            Some((2, Value::Bytes(bytes))) if bytes == b"abc"
        ));
        assert!(matches!(fields.next_field().unwrap(), Some((3, Value::Fixed))));
        assert!(matches!(fields.next_field().unwrap(), Some((4, Value::Fixed))));
        assert!(fields.next_field().unwrap().is_none());
    }

    #[test]
    fn test_group_wire_type_rejected() {
        let mut fields = Fields::new(&[0x0B]);
        assert!(matches!(fields.next_field(), Err(Error::MalformedVarint)));
    }

    #[test]
    fn test_length_past_end() {
        let mut fields = Fields::new(&[0x12, 0x05, b'a']);
        assert!(matches!(
            fields.next_field(),
            Err(Error::TruncatedRecord { needed: 5, available: 1 })
        ));
    }
}
