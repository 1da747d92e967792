//! Named holder of one prefix set per address family.

use bitflags::bitflags;
use ipnet::{IpNet, Ipv4Net};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::builder::{PrefixSet, PrefixSetBuilder};
use crate::cidr::{parse_range, render, AddressFamily, IpRange, OutputType, RangeItem};
use crate::{Error, Result};

bitflags! {
    /// Address families selected for output.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct IpFamilies: u8 {
        /// IPv4 prefixes
        const V4 = 0b01;
        /// IPv6 prefixes
        const V6 = 0b10;
    }
}

impl IpFamilies {
    /// Whether `family` is selected.
    pub fn includes(self, family: AddressFamily) -> bool {
        self.contains(IpFamilies::from(family))
    }

    /// Parse a family selector: `ipv4`, `ipv6` or `both` (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "4" | "v4" | "ipv4" => Some(IpFamilies::V4),
            "6" | "v6" | "ipv6" => Some(IpFamilies::V6),
            "both" | "all" => Some(IpFamilies::all()),
            _ => None,
        }
    }
}

impl Default for IpFamilies {
    fn default() -> Self {
        IpFamilies::all()
    }
}

impl From<AddressFamily> for IpFamilies {
    fn from(family: AddressFamily) -> Self {
        match family {
            AddressFamily::V4 => IpFamilies::V4,
            AddressFamily::V6 => IpFamilies::V6,
        }
    }
}

/// Prefixes collected under one code, split by family.
///
/// Each family's builder is created on first insertion. IPv4-mapped IPv6
/// input (`::ffff:a.b.c.d`) is stored as IPv4.
#[derive(Debug, Clone)]
pub struct Entry {
    name: String,
    v4: Option<PrefixSetBuilder>,
    v6: Option<PrefixSetBuilder>,
}

impl Entry {
    /// Create an empty entry. The name is trimmed and upper-cased.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_uppercase(),
            v4: None,
            v6: None,
        }
    }

    /// Entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether no family holds any prefix.
    pub fn is_empty(&self) -> bool {
        self.v4.as_ref().map_or(true, PrefixSetBuilder::is_empty)
            && self.v6.as_ref().map_or(true, PrefixSetBuilder::is_empty)
    }

    /// Add a network.
    pub fn add_prefix(&mut self, prefix: IpNet) -> Result<()> {
        let prefix = classify(prefix)?;
        self.builder_mut(family_of(&prefix)).add_prefix(prefix)
    }

    /// Add a single address.
    pub fn add_addr(&mut self, addr: IpAddr) -> Result<()> {
        self.add_prefix(IpNet::from(unmap(addr)))
    }

    /// Add a parsed address, network or range.
    pub fn add_item(&mut self, item: RangeItem) -> Result<()> {
        match item {
            RangeItem::Addr(addr) => self.add_addr(addr),
            RangeItem::Net(net) => self.add_prefix(net),
            RangeItem::Range(range) => {
                let range = classify_range(range)?;
                self.builder_mut(range.family()).add_range(range)
            }
        }
    }

    /// Add one line of text: an address, a CIDR or a `start-end` range.
    ///
    /// Trailing comments starting with `#`, `//` or `/*` are stripped and
    /// lines left empty are ignored.
    pub fn add_text(&mut self, line: &str) -> Result<()> {
        match strip_comment(line) {
            "" => Ok(()),
            text => self.add_item(parse_range(text)?),
        }
    }

    /// Remove a network from what was added.
    pub fn remove_prefix(&mut self, prefix: IpNet) -> Result<()> {
        let prefix = classify(prefix)?;
        match self.slot(family_of(&prefix)) {
            Some(builder) => builder.remove_prefix(prefix),
            None => Ok(()),
        }
    }

    /// Remove a parsed address, network or range.
    pub fn remove_item(&mut self, item: RangeItem) -> Result<()> {
        match item {
            RangeItem::Addr(addr) => self.remove_prefix(IpNet::from(unmap(addr))),
            RangeItem::Net(net) => self.remove_prefix(net),
            RangeItem::Range(range) => {
                let range = classify_range(range)?;
                match self.slot(range.family()) {
                    Some(builder) => builder.remove_range(range),
                    None => Ok(()),
                }
            }
        }
    }

    /// Remove one line of text, with the same syntax as [`add_text`](Self::add_text).
    pub fn remove_text(&mut self, line: &str) -> Result<()> {
        match strip_comment(line) {
            "" => Ok(()),
            text => self.remove_item(parse_range(text)?),
        }
    }

    /// Canonical IPv4 set, if any IPv4 prefix was ever added.
    pub fn v4_set(&mut self) -> Option<&PrefixSet> {
        self.set(AddressFamily::V4)
    }

    /// Canonical IPv6 set, if any IPv6 prefix was ever added.
    pub fn v6_set(&mut self) -> Option<&PrefixSet> {
        self.set(AddressFamily::V6)
    }

    /// Whether `addr` is covered. IPv4-mapped IPv6 addresses match IPv4 prefixes.
    pub fn contains(&mut self, addr: IpAddr) -> bool {
        let addr = unmap(addr);
        self.set(AddressFamily::of(&addr))
            .map_or(false, |set| set.contains(addr))
    }

    /// Canonical ranges of the selected families, IPv4 first.
    pub fn marshal_ranges(&mut self, families: IpFamilies) -> Result<Vec<IpRange>> {
        let mut ranges = Vec::new();
        for family in [AddressFamily::V4, AddressFamily::V6] {
            if !families.includes(family) {
                continue;
            }
            if let Some(set) = self.set(family) {
                ranges.extend_from_slice(set.ranges());
            }
        }
        if ranges.is_empty() {
            return Err(Error::EmptyEntry(self.name.clone()));
        }
        Ok(ranges)
    }

    /// Canonical CIDR blocks of the selected families, IPv4 first.
    pub fn marshal_prefixes(&mut self, families: IpFamilies) -> Result<Vec<IpNet>> {
        Ok(self
            .marshal_ranges(families)?
            .iter()
            .flat_map(IpRange::to_prefixes)
            .collect())
    }

    /// Canonical text lines of the selected families.
    pub fn marshal_text(&mut self, families: IpFamilies, output: OutputType) -> Result<Vec<String>> {
        Ok(render(&self.marshal_ranges(families)?, output))
    }

    fn slot(&mut self, family: AddressFamily) -> Option<&mut PrefixSetBuilder> {
        match family {
            AddressFamily::V4 => self.v4.as_mut(),
            AddressFamily::V6 => self.v6.as_mut(),
        }
    }

    fn builder_mut(&mut self, family: AddressFamily) -> &mut PrefixSetBuilder {
        let slot = match family {
            AddressFamily::V4 => &mut self.v4,
            AddressFamily::V6 => &mut self.v6,
        };
        slot.get_or_insert_with(|| PrefixSetBuilder::new(family))
    }

    fn set(&mut self, family: AddressFamily) -> Option<&PrefixSet> {
        self.slot(family).map(|builder| &*builder.finalize())
    }
}

fn family_of(net: &IpNet) -> AddressFamily {
    match net {
        IpNet::V4(_) => AddressFamily::V4,
        IpNet::V6(_) => AddressFamily::V6,
    }
}

fn unmap(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(addr, IpAddr::V4),
        IpAddr::V4(_) => addr,
    }
}

/// Move IPv4-mapped networks into the IPv4 family and clear host bits.
///
/// The mapping is recognised on the address as written, so a mapped
/// network shorter than /96 is rejected rather than truncated into IPv6.
fn classify(net: IpNet) -> Result<IpNet> {
    let v6 = match net {
        IpNet::V4(v4) => return Ok(IpNet::V4(v4.trunc())),
        IpNet::V6(v6) => v6,
    };
    let Some(v4) = v6.addr().to_ipv4_mapped() else {
        return Ok(IpNet::V6(v6.trunc()));
    };

    let len = v6.prefix_len();
    let invalid = Error::InvalidPrefixLength {
        family: AddressFamily::V6,
        len,
    };
    if len < 96 {
        return Err(invalid);
    }
    Ipv4Net::new(v4, len - 96)
        .map(|net| IpNet::V4(net.trunc()))
        .map_err(|_| invalid)
}

/// Move a range with both ends IPv4-mapped into the IPv4 family.
fn classify_range(range: IpRange) -> Result<IpRange> {
    if range.family() == AddressFamily::V4 {
        return Ok(range);
    }
    match (unmap(range.start()), unmap(range.end())) {
        (IpAddr::V6(_), IpAddr::V6(_)) => Ok(range),
        (start @ IpAddr::V4(_), end @ IpAddr::V4(_)) => IpRange::new(start, end),
        (start, end) => Err(Error::CrossFamilyMix {
            expected: AddressFamily::of(&start),
            found: AddressFamily::of(&end),
        }),
    }
}

fn strip_comment(line: &str) -> &str {
    let end = ["#", "//", "/*"]
        .iter()
        .filter_map(|marker| line.find(marker))
        .min()
        .unwrap_or(line.len());
    line[..end].trim()
}
