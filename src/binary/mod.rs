//! Binary geo-database layout: locating, indexing and writing records.
//!
//! A database is a flat sequence of length-delimited records, each keyed
//! by a short code:
//!
//! ```text
//! +-----+-------------+-----------------------------------------+
//! | tag | varint len  |                 body                    |
//! +-----+-------------+-----+----------+--------+---------------+
//!                     | tag | code len |  code  |    payload    |
//!                     | 1B  |    1B    |  <=127 |   remaining   |
//!                     +-----+----------+--------+---------------+
//! ```
//!
//! The payload is opaque at this layer. Three access modes return the
//! same bytes for the same code:
//!
//! - [`locate_in_buffer`] scans an in-memory blob and borrows from it.
//! - [`locate_in_stream`] scans a seekable stream through a small window.
//! - [`build_index`] makes one pass, after which each code is a single
//!   seek and read.
//!
//! A code occurring more than once resolves to its last occurrence. A
//! corrupt or truncated record ends a scan as if the data stopped there.

pub(crate) mod fields;
mod index;
mod locator;
mod source;
mod varint;
pub mod writer;

#[cfg(test)]
mod tests;

pub use index::{build_index, CodeIndex, CodeIndexTable, IndexedReader};
pub use locator::{
    code_list, locate_in_buffer, locate_in_stream, Record, RecordHeader, Records, LOOKAHEAD,
};
pub use source::LocateMode;
pub(crate) use source::Source;
pub use varint::{decode_varint, encode_varint, read_varint, varint_len, MAX_VARINT_LEN};
pub use writer::RecordWriter;
