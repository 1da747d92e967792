//! IP range canonicalization.
//!
//! Text is parsed into [`RangeItem`]s (address, network or explicit range),
//! every item reduces to an inclusive [`IpRange`], and range sets are merged
//! into minimal disjoint form and re-expanded into minimal CIDR blocks.
//! IPv4 and IPv6 values are never combined.

mod merge;
mod parser;
mod range;

pub use merge::{render, sort_and_merge, to_minimal_prefixes, OutputType};
pub use parser::parse_range;
pub use range::{AddressFamily, IpRange, RangeItem};

pub(crate) use range::{addr_to_bits, bits_to_addr, net_from_bits};
