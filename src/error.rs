//! Error types for geodat.

use thiserror::Error;

use crate::cidr::AddressFamily;

/// Error type for geodat operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Varint ran past 10 bytes or the input ended before its last byte
    #[error("malformed varint")]
    MalformedVarint,

    /// A record claims more bytes than the input holds
    #[error("truncated record: need {needed} bytes, {available} available")]
    TruncatedRecord { needed: usize, available: usize },

    /// Requested code is not present in the database
    #[error("code not found: {0}")]
    CodeNotFound(String),

    /// Invalid CIDR notation
    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    /// Invalid IP address
    #[error("invalid IP address: {0}")]
    InvalidIp(String),

    /// Hyphen range whose endpoints do not parse
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Hyphen range with start > end or mixed families
    #[error("invalid range order: {0}")]
    InvalidRangeOrder(String),

    /// Prefix length out of bounds for the address family
    #[error("invalid prefix length {len} for {family}")]
    InvalidPrefixLength { family: AddressFamily, len: u8 },

    /// Values of different address families were combined
    #[error("address family mismatch: expected {expected}, found {found}")]
    CrossFamilyMix {
        expected: AddressFamily,
        found: AddressFamily,
    },

    /// Text is neither an IP, a CIDR nor a range
    #[error("not an IP/CIDR address/range: {0}")]
    NotAddress(String),

    /// Code cannot be stored in the record layout
    #[error("invalid code: {0:?}")]
    InvalidCode(String),

    /// GeoSite domain rule with an unknown type or a non UTF-8 value
    #[error("invalid domain rule: {0}")]
    InvalidDomain(String),

    /// Entry holds no prefix in the requested families
    #[error("entry {0} has no prefix")]
    EmptyEntry(String),

    /// None of the wanted codes produced any data
    #[error("no matching code found")]
    NoMatch,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for geodat operations.
pub type Result<T> = std::result::Result<T, Error>;
