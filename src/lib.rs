//! geodat - Geo-database extraction and IP range toolkit.
//!
//! This crate reads the length-delimited binary geo-databases that map
//! country (or list) codes to IP ranges or domain rules, and turns the
//! records of selected codes into canonical, merged CIDR or range lists
//! and filtered domain lists.
//!
//! # Features
//!
//! - **Record location**: find a code's payload in a buffer, a stream, or
//!   through a one-pass index
//! - **Low-memory scanning**: stream mode reads a small window per record
//! - **Range parsing**: CIDR, bare address and `start-end` range text
//! - **Range merging**: sort, merge and decompose into minimal CIDR blocks
//! - **Prefix sets**: add/remove prefixes and answer point queries
//! - **GeoIP facade**: extract, look up and re-export database codes
//! - **GeoSite facade**: extract domain lists by attribute and re-export sites
//!
//! # Quick Start
//!
//! ```
//! use geodat::cidr::{parse_range, sort_and_merge};
//!
//! let items = ["10.0.0.0/24", "10.0.1.0/24"]
//!     .iter()
//!     .map(|t| parse_range(t))
//!     .collect::<geodat::Result<Vec<_>>>()?;
//!
//! let merged = sort_and_merge(items);
//! assert_eq!(merged[0].to_prefixes()[0].to_string(), "10.0.0.0/23");
//! # Ok::<(), geodat::Error>(())
//! ```
//!
//! # Reading a Database
//!
//! ```no_run
//! use geodat::geoip::{ExtractConfig, GeoIpReader};
//!
//! let reader = GeoIpReader::open("geoip.dat", ExtractConfig::new(["cn", "hk"]))?;
//! let lines = reader.extract_text()?;
//! println!("{} CIDRs", lines.len());
//! # Ok::<(), geodat::Error>(())
//! ```
//!
//! # Access Modes
//!
//! - **Buffered**: memory-map the file and scan it
//! - **Streaming**: scan through a fixed lookahead window, for large files
//! - **Indexed**: index every code once, then seek straight to each one

mod error;

pub mod binary;
pub mod cidr;
pub mod geoip;
pub mod geosite;
pub mod prefix_set;

// Re-export core types
pub use error::{Error, Result};

// Re-export range types
pub use cidr::{AddressFamily, IpRange, OutputType, RangeItem};

// Re-export prefix sets
pub use prefix_set::{Entry, IpFamilies, PrefixSet, PrefixSetBuilder};

// Re-export the database facade
pub use geoip::{ExtractConfig, GeoIpReader, LocateMode};
pub use geosite::{GeoSiteReader, SiteConfig};
