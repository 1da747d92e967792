//! Sorting, merging and CIDR decomposition of range sets.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use super::range::{net_from_bits, IpRange};

/// Merge ranges into the minimal ordered set of disjoint, non-adjacent
/// ranges covering the same addresses.
///
/// Families may be mixed in the input; the output lists every IPv4 range
/// before every IPv6 range and never merges across families.
///
/// # Examples
/// ```
/// use geodat::cidr::{parse_range, sort_and_merge};
///
/// let items = [
///     parse_range("10.0.1.0/24").unwrap(),
///     parse_range("10.0.0.0/24").unwrap(),
/// ];
/// let merged = sort_and_merge(items);
/// assert_eq!(merged.len(), 1);
/// assert_eq!(merged[0].to_string(), "10.0.0.0-10.0.1.255");
/// ```
pub fn sort_and_merge<I>(items: I) -> Vec<IpRange>
where
    I: IntoIterator,
    I::Item: Into<IpRange>,
{
    let mut ranges: Vec<IpRange> = items.into_iter().map(Into::into).collect();
    ranges.sort_unstable();

    let mut merged = Vec::with_capacity(ranges.len());
    let mut ranges = ranges.into_iter();
    let mut current = match ranges.next() {
        Some(first) => first,
        None => return merged,
    };

    for next in ranges {
        if next.family() != current.family() {
            merged.push(current);
            current = next;
            continue;
        }

        let end = current.end_bits();
        // Checking for the all-ones end first keeps `end + 1` from overflowing.
        if end == current.family().max_value() || end + 1 >= next.start_bits() {
            if next.end_bits() > end {
                current =
                    IpRange::from_bits(current.family(), current.start_bits(), next.end_bits());
            }
        } else {
            merged.push(current);
            current = next;
        }
    }
    merged.push(current);
    merged
}

/// Decompose a range into the fewest aligned CIDR blocks whose union is
/// exactly the range, in ascending order.
pub fn to_minimal_prefixes(range: &IpRange) -> Vec<IpNet> {
    let family = range.family();
    let bits = family.bits() as u32;
    let end = range.end_bits();
    let mut cursor = range.start_bits();
    let mut prefixes = Vec::new();

    loop {
        // Largest block aligned at `cursor`, shrunk until it stays inside the range.
        let mut host_bits = if cursor == 0 {
            bits
        } else {
            cursor.trailing_zeros().min(bits)
        };
        while host_bits > 0 && (cursor | host_mask(host_bits)) > end {
            host_bits -= 1;
        }

        if let Some(net) = net_from_bits(family, cursor, (bits - host_bits) as u8) {
            prefixes.push(net);
        }

        let last = cursor | host_mask(host_bits);
        if last >= end {
            return prefixes;
        }
        cursor = last + 1;
    }
}

fn host_mask(host_bits: u32) -> u128 {
    match host_bits {
        0 => 0,
        n if n >= 128 => u128::MAX,
        n => (1u128 << n) - 1,
    }
}

/// Text form of a merged range set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// Minimal CIDR blocks, `a.b.c.d/n`
    #[default]
    Cidr,
    /// Inclusive ranges, `start-end`
    Range,
}

impl OutputType {
    /// Parse an output type from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cidr" => Some(OutputType::Cidr),
            "range" => Some(OutputType::Range),
            _ => None,
        }
    }
}

/// Render ranges as text lines in the requested form.
pub fn render(ranges: &[IpRange], output: OutputType) -> Vec<String> {
    match output {
        OutputType::Range => ranges.iter().map(|r| r.to_string()).collect(),
        OutputType::Cidr => ranges
            .iter()
            .flat_map(|r| r.to_prefixes())
            .map(|net| net.to_string())
            .collect(),
    }
}
