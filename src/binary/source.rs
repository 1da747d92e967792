//! Database files opened in one of the access modes.

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

use super::index::{build_index, CodeIndexTable, IndexedReader};
use super::locator::{locate_in_buffer, locate_in_stream};
use crate::{Error, Result};

/// How records are located inside a database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocateMode {
    /// Memory-map the whole file and scan it per code
    Buffered,
    /// Scan the file through a small window per code
    Streaming,
    /// Index the file once, then seek straight to each code
    #[default]
    Indexed,
}

impl LocateMode {
    /// Parse a mode from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "buffered" | "mmap" => Some(LocateMode::Buffered),
            "streaming" | "lowmem" => Some(LocateMode::Streaming),
            "indexed" | "index" => Some(LocateMode::Indexed),
            _ => None,
        }
    }
}

/// An opened database file.
pub(crate) enum Source {
    Mapped(Mmap),
    /// Raw handle. Offsets are kept once a full scan has listed the codes.
    Streaming {
        file: File,
        index: Option<CodeIndexTable>,
    },
    Indexed(IndexedReader<File>),
}

impl Source {
    pub(crate) fn open(path: &Path, mode: LocateMode) -> Result<Self> {
        let file = File::open(path)?;
        let source = match mode {
            // The file is opened read-only and never written while mapped.
            LocateMode::Buffered => Source::Mapped(unsafe { Mmap::map(&file)? }),
            LocateMode::Streaming => Source::Streaming { file, index: None },
            LocateMode::Indexed => Source::Indexed(IndexedReader::new(file)?),
        };
        Ok(source)
    }

    /// Distinct codes in first occurrence order.
    pub(crate) fn codes(&mut self) -> Result<Vec<String>> {
        let codes = match self {
            Source::Mapped(map) => CodeIndexTable::from_buffer(map)
                .codes()
                .map(str::to_string)
                .collect(),
            Source::Streaming { file, index } => {
                let table = build_index(file)?;
                let codes = table.codes().map(str::to_string).collect();
                *index = Some(table);
                codes
            }
            Source::Indexed(reader) => reader.codes().map(str::to_string).collect(),
        };
        Ok(codes)
    }

    /// Payload of `code`, or `None` when the code is absent.
    pub(crate) fn payload(&mut self, code: &str) -> Result<Option<Cow<'_, [u8]>>> {
        let found = match self {
            Source::Mapped(map) => locate_in_buffer(map, code).map(Cow::Borrowed),
            Source::Streaming {
                file,
                index: Some(table),
            } => table.read(file, code).map(Cow::Owned),
            Source::Streaming { file, index: None } => {
                locate_in_stream(file, code).map(Cow::Owned)
            }
            Source::Indexed(reader) => reader.read_code(code).map(Cow::Owned),
        };
        match found {
            Ok(payload) => Ok(Some(payload)),
            Err(Error::CodeNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
