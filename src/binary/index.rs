//! One-pass code index for repeated random access to a stream.

use ahash::AHashMap;
use std::io::{Read, Seek};

use super::locator::{read_at, scan_stream, Records};
use crate::{Error, Result};

/// Location of a code's payload inside a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeIndex {
    /// Code as stored in the database
    pub name: String,
    /// Byte offset of the payload from the start of the stream
    pub offset: u64,
    /// Payload length in bytes
    pub size: u64,
}

/// Offsets of every code in a database.
///
/// Codes keep the order of their first occurrence; a repeated code takes the
/// location of its last occurrence, matching what a full scan returns.
#[derive(Debug, Clone, Default)]
pub struct CodeIndexTable {
    entries: Vec<CodeIndex>,
    by_name: AHashMap<String, usize>,
}

impl CodeIndexTable {
    /// Build the table with a single forward pass over `reader`.
    pub fn build<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut table = Self::default();
        scan_stream(reader, |code, offset, size| {
            table.insert(code, offset, size as u64);
        })?;
        log::debug!("indexed {} codes", table.len());
        Ok(table)
    }

    /// Build the table from an in-memory blob.
    pub fn from_buffer(data: &[u8]) -> Self {
        let mut table = Self::default();
        for record in Records::new(data) {
            table.insert(record.code, record.offset as u64, record.payload.len() as u64);
        }
        table
    }

    fn insert(&mut self, code: &[u8], offset: u64, size: u64) {
        if code.is_empty() {
            return;
        }
        let name = match std::str::from_utf8(code) {
            Ok(name) => name,
            Err(_) => {
                log::debug!("skipping non UTF-8 code at offset {}", offset);
                return;
            }
        };

        let entry = CodeIndex {
            name: name.to_string(),
            offset,
            size,
        };
        match self.by_name.get(name) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                self.by_name.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Look up the location of `code`.
    pub fn get(&self, code: &str) -> Option<&CodeIndex> {
        self.by_name.get(code).map(|&slot| &self.entries[slot])
    }

    /// Whether `code` is present.
    pub fn contains(&self, code: &str) -> bool {
        self.by_name.contains_key(code)
    }

    /// Number of distinct codes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no codes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in first occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = &CodeIndex> {
        self.entries.iter()
    }

    /// Iterate over the code names in first occurrence order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Seek to and read the payload of `code`.
    pub fn read<R: Read + Seek + ?Sized>(&self, reader: &mut R, code: &str) -> Result<Vec<u8>> {
        let entry = self
            .get(code)
            .ok_or_else(|| Error::CodeNotFound(code.to_string()))?;
        read_at(reader, entry.offset, entry.size as usize)
    }

    /// Slice the payload of `code` out of the blob the table was built from.
    pub fn slice<'a>(&self, data: &'a [u8], code: &str) -> Result<&'a [u8]> {
        let entry = self
            .get(code)
            .ok_or_else(|| Error::CodeNotFound(code.to_string()))?;
        let start = entry.offset as usize;
        let end = start.saturating_add(entry.size as usize);
        data.get(start..end).ok_or(Error::TruncatedRecord {
            needed: end,
            available: data.len(),
        })
    }
}

/// Build the code index of a stream.
pub fn build_index<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<CodeIndexTable> {
    CodeIndexTable::build(reader)
}

/// A stream together with its code index.
///
/// Owns the stream exclusively; every read seeks, so interleaving other
/// access to the same handle is not supported.
pub struct IndexedReader<R> {
    reader: R,
    index: CodeIndexTable,
}

impl<R: Read + Seek> IndexedReader<R> {
    /// Index `reader` and keep it for later reads.
    pub fn new(mut reader: R) -> Result<Self> {
        let index = CodeIndexTable::build(&mut reader)?;
        Ok(Self { reader, index })
    }

    /// The code index.
    pub fn index(&self) -> &CodeIndexTable {
        &self.index
    }

    /// Code names in first occurrence order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.index.codes()
    }

    /// Read the payload of `code`.
    pub fn read_code(&mut self, code: &str) -> Result<Vec<u8>> {
        self.index.read(&mut self.reader, code)
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader
    }
}
