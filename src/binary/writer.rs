//! Geo-database blob writer.

use std::io::Write;

use super::varint::{encode_varint, varint_len};
use crate::{Error, Result};

/// Tag of a top-level record (field 1, length-delimited).
pub const RECORD_TAG: u8 = 0x0A;

/// Tag of the code field opening every record body.
pub const CODE_TAG: u8 = 0x0A;

/// Longest code that fits the single length byte of the layout.
pub const MAX_CODE_LEN: usize = 127;

/// Builds a geo-database blob in memory, one record per code.
pub struct RecordWriter {
    buffer: Vec<u8>,
    records: usize,
}

impl RecordWriter {
    /// Create a new writer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64 * 1024),
            records: 0,
        }
    }

    /// Append a record holding `payload` under `code`.
    pub fn push(&mut self, code: &str, payload: &[u8]) -> Result<()> {
        if code.is_empty() || code.len() > MAX_CODE_LEN {
            return Err(Error::InvalidCode(code.to_string()));
        }

        let body_len = 2 + code.len() + payload.len();
        self.buffer
            .reserve(1 + varint_len(body_len as u64) + body_len);
        self.buffer.push(RECORD_TAG);
        encode_varint(body_len as u64, &mut self.buffer);
        self.buffer.push(CODE_TAG);
        self.buffer.push(code.len() as u8);
        self.buffer.extend_from_slice(code.as_bytes());
        self.buffer.extend_from_slice(payload);
        self.records += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn record_count(&self) -> usize {
        self.records
    }

    /// Size of the blob so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Write the blob to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&self.buffer)?;
        Ok(())
    }

    /// Take the finished blob.
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for RecordWriter {
    fn default() -> Self {
        Self::new()
    }
}
