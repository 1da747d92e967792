//! Typed address ranges.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::merge::to_minimal_prefixes;
use crate::{Error, Result};

/// IP address family.
///
/// Ordered so that every IPv4 value sorts before every IPv6 value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressFamily {
    /// 4-byte addresses
    V4,
    /// 16-byte addresses
    V6,
}

impl AddressFamily {
    /// Family of an address.
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    /// Address width in bytes.
    pub const fn width(self) -> usize {
        match self {
            AddressFamily::V4 => 4,
            AddressFamily::V6 => 16,
        }
    }

    /// Address width in bits.
    pub const fn bits(self) -> u8 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 128,
        }
    }

    /// Numeric value of the all-ones address.
    pub const fn max_value(self) -> u128 {
        match self {
            AddressFamily::V4 => u32::MAX as u128,
            AddressFamily::V6 => u128::MAX,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Numeric value of an address, big-endian over its bytes.
pub(crate) fn addr_to_bits(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(v4) as u128,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

/// Address with the given numeric value.
pub(crate) fn bits_to_addr(family: AddressFamily, bits: u128) -> IpAddr {
    match family {
        AddressFamily::V4 => IpAddr::V4(Ipv4Addr::from(bits as u32)),
        AddressFamily::V6 => IpAddr::V6(Ipv6Addr::from(bits)),
    }
}

/// Network `bits/prefix_len`, or `None` if the length exceeds the family.
pub(crate) fn net_from_bits(family: AddressFamily, bits: u128, prefix_len: u8) -> Option<IpNet> {
    match family {
        AddressFamily::V4 => Ipv4Net::new(Ipv4Addr::from(bits as u32), prefix_len)
            .ok()
            .map(IpNet::V4),
        AddressFamily::V6 => Ipv6Net::new(Ipv6Addr::from(bits), prefix_len)
            .ok()
            .map(IpNet::V6),
    }
}

/// A contiguous, inclusive range of addresses within one family.
///
/// Ranges order by family, then start, then end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IpRange {
    family: AddressFamily,
    start: u128,
    end: u128,
}

impl IpRange {
    /// Create the range `start..=end`.
    ///
    /// Both ends must share a family and `start` must not exceed `end`.
    pub fn new(start: IpAddr, end: IpAddr) -> Result<Self> {
        let family = AddressFamily::of(&start);
        let end_family = AddressFamily::of(&end);
        if family != end_family {
            return Err(Error::CrossFamilyMix {
                expected: family,
                found: end_family,
            });
        }
        let (start_bits, end_bits) = (addr_to_bits(start), addr_to_bits(end));
        if start_bits > end_bits {
            return Err(Error::InvalidRangeOrder(format!("{}-{}", start, end)));
        }
        Ok(Self::from_bits(family, start_bits, end_bits))
    }

    /// Range holding a single address.
    pub fn point(addr: IpAddr) -> Self {
        let bits = addr_to_bits(addr);
        Self::from_bits(AddressFamily::of(&addr), bits, bits)
    }

    /// Range covered by a network, host bits ignored.
    pub fn from_net(net: &IpNet) -> Self {
        Self::from_bits(
            AddressFamily::of(&net.network()),
            addr_to_bits(net.network()),
            addr_to_bits(net.broadcast()),
        )
    }

    pub(crate) fn from_bits(family: AddressFamily, start: u128, end: u128) -> Self {
        debug_assert!(start <= end && end <= family.max_value());
        Self { family, start, end }
    }

    /// Address family of both ends.
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// First address.
    pub fn start(&self) -> IpAddr {
        bits_to_addr(self.family, self.start)
    }

    /// Last address.
    pub fn end(&self) -> IpAddr {
        bits_to_addr(self.family, self.end)
    }

    pub(crate) fn start_bits(&self) -> u128 {
        self.start
    }

    pub(crate) fn end_bits(&self) -> u128 {
        self.end
    }

    /// Whether `addr` lies inside the range. Other families never do.
    pub fn contains(&self, addr: IpAddr) -> bool {
        if AddressFamily::of(&addr) != self.family {
            return false;
        }
        let bits = addr_to_bits(addr);
        self.start <= bits && bits <= self.end
    }

    /// Whether the range covers the whole address space of its family.
    pub fn is_full(&self) -> bool {
        self.start == 0 && self.end == self.family.max_value()
    }

    /// Smallest set of CIDR blocks covering exactly this range.
    pub fn to_prefixes(&self) -> Vec<IpNet> {
        to_minimal_prefixes(self)
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start(), self.end())
    }
}

impl From<IpNet> for IpRange {
    fn from(net: IpNet) -> Self {
        IpRange::from_net(&net)
    }
}

impl From<IpAddr> for IpRange {
    fn from(addr: IpAddr) -> Self {
        IpRange::point(addr)
    }
}

/// A parsed address value: a single address, a network or an explicit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeItem {
    /// A bare address
    Addr(IpAddr),
    /// A CIDR network (host bits cleared)
    Net(IpNet),
    /// An explicit `start-end` range
    Range(IpRange),
}

impl RangeItem {
    /// Address family of the value.
    pub fn family(&self) -> AddressFamily {
        match self {
            RangeItem::Addr(addr) => AddressFamily::of(addr),
            RangeItem::Net(net) => AddressFamily::of(&net.network()),
            RangeItem::Range(range) => range.family(),
        }
    }

    /// The value as an inclusive range.
    pub fn to_range(&self) -> IpRange {
        match self {
            RangeItem::Addr(addr) => IpRange::point(*addr),
            RangeItem::Net(net) => IpRange::from_net(net),
            RangeItem::Range(range) => *range,
        }
    }

    /// The value as CIDR blocks.
    pub fn to_prefixes(&self) -> Vec<IpNet> {
        match self {
            RangeItem::Net(net) => vec![net.trunc()],
            other => other.to_range().to_prefixes(),
        }
    }
}

impl fmt::Display for RangeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeItem::Addr(addr) => write!(f, "{}", addr),
            RangeItem::Net(net) => write!(f, "{}", net),
            RangeItem::Range(range) => write!(f, "{}", range),
        }
    }
}

impl From<RangeItem> for IpRange {
    fn from(item: RangeItem) -> Self {
        item.to_range()
    }
}

impl From<&RangeItem> for IpRange {
    fn from(item: &RangeItem) -> Self {
        item.to_range()
    }
}
