//! Record locator: finds the payload stored under a code without decoding
//! the surrounding database.
//!
//! Scans are lenient: a malformed or truncated record ends the scan as if
//! the data stopped there. Records before it are still visible, which keeps
//! partially written or appended files usable.

use std::io::{Read, Seek, SeekFrom};

use super::varint::decode_varint;
use crate::{Error, Result};

/// Bytes read ahead of each record when scanning a stream.
///
/// Large enough for the tag, a maximal varint and the body's tag and code
/// length byte, plus a typical short code.
pub const LOOKAHEAD: usize = 30;

/// Framing in front of every record body: a tag byte and a varint length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Tag byte preceding the length
    pub tag: u8,
    /// Length of the tag plus the varint
    pub header_len: usize,
    /// Length of the record body
    pub body_len: usize,
}

impl RecordHeader {
    /// Parse the header at the start of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < 2 {
            return Err(Error::TruncatedRecord {
                needed: 2,
                available: buf.len(),
            });
        }
        let (body_len, varint_len) = decode_varint(&buf[1..])?;
        let body_len = usize::try_from(body_len).map_err(|_| Error::MalformedVarint)?;
        Ok(Self {
            tag: buf[0],
            header_len: 1 + varint_len,
            body_len,
        })
    }

    /// Total size of header plus body.
    pub fn record_len(&self) -> Result<usize> {
        self.header_len
            .checked_add(self.body_len)
            .ok_or(Error::MalformedVarint)
    }

    /// Check that a body holding a `code_len` byte code fits in this record.
    fn check_code_len(&self, code_len: usize) -> Result<()> {
        if self.body_len < 2 + code_len {
            return Err(Error::TruncatedRecord {
                needed: 2 + code_len,
                available: self.body_len,
            });
        }
        Ok(())
    }
}

/// One record of a geo-database blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    /// Tag byte of the record header
    pub tag: u8,
    /// Raw code bytes (may be empty)
    pub code: &'a [u8],
    /// Bytes following the code
    pub payload: &'a [u8],
    /// Offset of `payload` from the start of the blob
    pub offset: usize,
}

/// Zero-copy iterator over the records of an in-memory blob.
pub struct Records<'a> {
    data: &'a [u8],
    pos: usize,
    stopped_early: bool,
}

impl<'a> Records<'a> {
    /// Iterate over `data` from its first byte.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            stopped_early: false,
        }
    }

    /// Whether iteration ended on a malformed or truncated record rather than
    /// at the end of the data.
    pub fn stopped_early(&self) -> bool {
        self.stopped_early
    }

    fn next_record(&mut self) -> Result<Record<'a>> {
        let rest = &self.data[self.pos..];
        let header = RecordHeader::parse(rest)?;
        let record_len = header.record_len()?;
        if record_len > rest.len() {
            return Err(Error::TruncatedRecord {
                needed: record_len,
                available: rest.len(),
            });
        }

        let body = &rest[header.header_len..record_len];
        header.check_code_len(body.get(1).copied().unwrap_or(0) as usize)?;
        let code_len = body[1] as usize;
        let code = &body[2..2 + code_len];
        let payload = &body[2 + code_len..];
        let offset = self.pos + header.header_len + 2 + code_len;

        self.pos += record_len;
        Ok(Record {
            tag: header.tag,
            code,
            payload,
            offset,
        })
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        match self.next_record() {
            Ok(record) => Some(record),
            Err(e) => {
                log::debug!("record scan stopped at offset {}: {}", self.pos, e);
                self.stopped_early = true;
                self.pos = self.data.len();
                None
            }
        }
    }
}

/// List the non-empty codes of a blob in file order.
pub fn code_list(data: &[u8]) -> Vec<&[u8]> {
    Records::new(data)
        .map(|r| r.code)
        .filter(|code| !code.is_empty())
        .collect()
}

/// Find the payload stored under `code` in an in-memory blob.
///
/// When a code occurs more than once the last occurrence wins. The returned
/// slice borrows from `data`.
pub fn locate_in_buffer<'a>(data: &'a [u8], code: &str) -> Result<&'a [u8]> {
    if code.is_empty() {
        return Err(Error::CodeNotFound(String::new()));
    }
    Records::new(data)
        .filter(|r| r.code == code.as_bytes())
        .last()
        .map(|r| r.payload)
        .ok_or_else(|| Error::CodeNotFound(code.to_string()))
}

/// Find the payload stored under `code` by scanning a seekable stream.
///
/// Only a [`LOOKAHEAD`] window is read per record; bodies of non-matching
/// records are skipped by seeking. The payload of the last matching record
/// is read once the scan completes.
pub fn locate_in_stream<R: Read + Seek + ?Sized>(reader: &mut R, code: &str) -> Result<Vec<u8>> {
    if code.is_empty() {
        return Err(Error::CodeNotFound(String::new()));
    }

    let mut found = None;
    scan_stream(reader, |record_code, offset, size| {
        if record_code == code.as_bytes() {
            found = Some((offset, size));
        }
    })?;

    let (offset, size) = found.ok_or_else(|| Error::CodeNotFound(code.to_string()))?;
    read_at(reader, offset, size)
}

/// Read `size` bytes at absolute `offset`.
pub(crate) fn read_at<R: Read + Seek + ?Sized>(
    reader: &mut R,
    offset: u64,
    size: usize,
) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut payload = vec![0u8; size];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Location of one record found while scanning a stream.
struct StreamRecord {
    payload_offset: u64,
    payload_len: usize,
    next: u64,
}

/// Walk every record of a stream from offset 0, calling `visit` with the
/// code, payload offset and payload length of each.
///
/// Framing errors end the scan quietly; IO errors are returned.
pub(crate) fn scan_stream<R, F>(reader: &mut R, mut visit: F) -> Result<()>
where
    R: Read + Seek + ?Sized,
    F: FnMut(&[u8], u64, usize),
{
    let stream_len = reader.seek(SeekFrom::End(0))?;
    let mut window = [0u8; LOOKAHEAD];
    let mut code = Vec::new();
    let mut pos = 0u64;

    while pos < stream_len {
        match read_stream_record(reader, pos, stream_len, &mut window, &mut code) {
            Ok(record) => {
                visit(&code, record.payload_offset, record.payload_len);
                pos = record.next;
            }
            Err(Error::Io(e)) => return Err(Error::Io(e)),
            Err(e) => {
                log::debug!("stream scan stopped at offset {}: {}", pos, e);
                break;
            }
        }
    }
    Ok(())
}

fn read_stream_record<R: Read + Seek + ?Sized>(
    reader: &mut R,
    pos: u64,
    stream_len: u64,
    window: &mut [u8; LOOKAHEAD],
    code: &mut Vec<u8>,
) -> Result<StreamRecord> {
    let available = stream_len - pos;
    let filled = available.min(LOOKAHEAD as u64) as usize;

    reader.seek(SeekFrom::Start(pos))?;
    reader.read_exact(&mut window[..filled])?;
    let head = &window[..filled];

    let header = RecordHeader::parse(head)?;
    let record_len = header.record_len()?;
    if record_len as u64 > available {
        return Err(Error::TruncatedRecord {
            needed: record_len,
            available: available as usize,
        });
    }

    // The record fits, so its code length byte lies inside the window.
    let code_len = match head.get(header.header_len + 1) {
        Some(&len) => len as usize,
        None => {
            return Err(Error::TruncatedRecord {
                needed: header.header_len + 2,
                available: filled,
            })
        }
    };
    header.check_code_len(code_len)?;

    let code_start = header.header_len + 2;
    code.clear();
    if code_start + code_len <= filled {
        code.extend_from_slice(&head[code_start..code_start + code_len]);
    } else {
        // The lookahead already consumed part of the code; seek back to it.
        reader.seek(SeekFrom::Start(pos + code_start as u64))?;
        code.resize(code_len, 0);
        reader.read_exact(code)?;
    }

    Ok(StreamRecord {
        payload_offset: pos + (code_start + code_len) as u64,
        payload_len: header.body_len - 2 - code_len,
        next: pos + record_len as u64,
    })
}
