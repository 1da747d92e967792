//! Per-family prefix accumulation and the canonical sets it produces.

use ipnet::IpNet;
use std::mem;
use std::net::IpAddr;

use crate::cidr::{addr_to_bits, sort_and_merge, AddressFamily, IpRange};
use crate::{Error, Result};

/// Immutable canonical set of addresses of one family.
///
/// Stored as sorted ranges that neither overlap nor touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixSet {
    family: AddressFamily,
    ranges: Vec<IpRange>,
}

impl PrefixSet {
    /// Family of every address in the set.
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Canonical ranges in ascending order.
    pub fn ranges(&self) -> &[IpRange] {
        &self.ranges
    }

    /// Canonical CIDR blocks in ascending order.
    pub fn prefixes(&self) -> Vec<IpNet> {
        self.ranges.iter().flat_map(|r| r.to_prefixes()).collect()
    }

    /// Number of canonical ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the set holds no address.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether `addr` belongs to the set. Addresses of the other family never do.
    pub fn contains(&self, addr: IpAddr) -> bool {
        if AddressFamily::of(&addr) != self.family {
            return false;
        }
        let bits = addr_to_bits(addr);
        let idx = self.ranges.partition_point(|r| r.end_bits() < bits);
        self.ranges
            .get(idx)
            .map_or(false, |r| r.start_bits() <= bits)
    }
}

/// Mutable accumulator of added and removed prefixes for one family.
///
/// Additions are buffered and merged lazily. [`finalize`](Self::finalize)
/// caches the canonical set; any later mutation drops the cache so the next
/// read rebuilds it.
#[derive(Debug, Clone)]
pub struct PrefixSetBuilder {
    family: AddressFamily,
    pending: Vec<IpRange>,
    cached: Option<PrefixSet>,
}

impl PrefixSetBuilder {
    /// Create an empty builder for `family`.
    pub fn new(family: AddressFamily) -> Self {
        Self {
            family,
            pending: Vec::new(),
            cached: None,
        }
    }

    /// Family accepted by this builder.
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Add every address of `range`.
    pub fn add_range(&mut self, range: IpRange) -> Result<()> {
        self.check_family(range.family())?;
        self.cached = None;
        self.pending.push(range);
        Ok(())
    }

    /// Add every address of `prefix`.
    pub fn add_prefix(&mut self, prefix: IpNet) -> Result<()> {
        self.add_range(IpRange::from_net(&prefix))
    }

    /// Remove every address of `range` from what has been added so far.
    pub fn remove_range(&mut self, range: IpRange) -> Result<()> {
        self.check_family(range.family())?;
        self.cached = None;
        let merged = sort_and_merge(mem::take(&mut self.pending));
        self.pending = subtract(merged, &range);
        Ok(())
    }

    /// Remove every address of `prefix` from what has been added so far.
    pub fn remove_prefix(&mut self, prefix: IpNet) -> Result<()> {
        self.remove_range(IpRange::from_net(&prefix))
    }

    /// Whether nothing has been added (or everything was removed again).
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The canonical set of everything added minus everything removed.
    pub fn finalize(&mut self) -> &PrefixSet {
        let family = self.family;
        let pending = &mut self.pending;
        self.cached.get_or_insert_with(|| {
            let ranges = sort_and_merge(mem::take(pending));
            *pending = ranges.clone();
            PrefixSet { family, ranges }
        })
    }

    fn check_family(&self, found: AddressFamily) -> Result<()> {
        if found != self.family {
            return Err(Error::CrossFamilyMix {
                expected: self.family,
                found,
            });
        }
        Ok(())
    }
}

/// Cut `cut` out of canonical `ranges`; a range straddling it keeps up to
/// two pieces.
fn subtract(ranges: Vec<IpRange>, cut: &IpRange) -> Vec<IpRange> {
    let (cut_start, cut_end) = (cut.start_bits(), cut.end_bits());
    let mut out = Vec::with_capacity(ranges.len() + 1);

    for range in ranges {
        let (start, end) = (range.start_bits(), range.end_bits());
        if end < cut_start || start > cut_end {
            out.push(range);
            continue;
        }
        if start < cut_start {
            out.push(IpRange::from_bits(range.family(), start, cut_start - 1));
        }
        if end > cut_end {
            out.push(IpRange::from_bits(range.family(), cut_end + 1, end));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_add_and_finalize() {
        let mut builder = PrefixSetBuilder::new(AddressFamily::V4);
        builder.add_prefix(net("10.0.1.0/24")).unwrap();
        builder.add_prefix(net("10.0.0.0/24")).unwrap();
        let set = builder.finalize();
        assert_eq!(set.len(), 1);
        assert_eq!(set.prefixes(), vec![net("10.0.0.0/23")]);
    }

    #[test]
    fn test_add_then_remove_is_empty() {
        let mut builder = PrefixSetBuilder::new(AddressFamily::V6);
        builder.add_prefix(net("2001:db8::/32")).unwrap();
        builder.remove_prefix(net("2001:db8::/32")).unwrap();
        assert!(builder.finalize().is_empty());
        assert!(builder.is_empty());
    }

    #[test]
    fn test_remove_splits_range() {
        let mut builder = PrefixSetBuilder::new(AddressFamily::V4);
        builder.add_prefix(net("10.0.0.0/24")).unwrap();
        builder.remove_prefix(net("10.0.0.128/26")).unwrap();
        let set = builder.finalize();
        assert_eq!(
            set.prefixes(),
            vec![net("10.0.0.0/25"), net("10.0.0.192/26")]
        );
        assert!(set.contains(ip("10.0.0.127")));
        assert!(!set.contains(ip("10.0.0.128")));
        assert!(!set.contains(ip("10.0.0.191")));
        assert!(set.contains(ip("10.0.0.192")));
    }

    #[test]
    fn test_remove_then_add_again() {
        let mut builder = PrefixSetBuilder::new(AddressFamily::V4);
        builder.add_prefix(net("10.0.0.0/8")).unwrap();
        builder.remove_prefix(net("10.1.0.0/16")).unwrap();
        builder.add_prefix(net("10.1.2.0/24")).unwrap();
        let set = builder.finalize();
        assert!(set.contains(ip("10.1.2.3")));
        assert!(!set.contains(ip("10.1.3.3")));
    }

    #[test]
    fn test_cache_invalidated_by_mutation() {
        let mut builder = PrefixSetBuilder::new(AddressFamily::V4);
        builder.add_prefix(net("192.168.0.0/16")).unwrap();
        assert!(builder.finalize().contains(ip("192.168.1.1")));

        builder.remove_prefix(net("192.168.1.0/24")).unwrap();
        assert!(!builder.finalize().contains(ip("192.168.1.1")));
        assert!(builder.finalize().contains(ip("192.168.2.1")));
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut builder = PrefixSetBuilder::new(AddressFamily::V4);
        builder.add_prefix(net("1.1.1.0/24")).unwrap();
        builder.add_prefix(net("1.1.1.0/25")).unwrap();
        let first = builder.finalize().clone();
        assert_eq!(builder.finalize(), &first);
    }

    #[test]
    fn test_cross_family_rejected_and_state_kept() {
        let mut builder = PrefixSetBuilder::new(AddressFamily::V4);
        builder.add_prefix(net("10.0.0.0/8")).unwrap();
        assert!(matches!(
            builder.add_prefix(net("::/0")),
            Err(Error::CrossFamilyMix { .. })
        ));
        assert!(matches!(
            builder.remove_prefix(net("::/0")),
            Err(Error::CrossFamilyMix { .. })
        ));
        assert_eq!(builder.finalize().prefixes(), vec![net("10.0.0.0/8")]);
    }

    #[test]
    fn test_contains_wrong_family() {
        let mut builder = PrefixSetBuilder::new(AddressFamily::V4);
        builder.add_prefix(net("0.0.0.0/0")).unwrap();
        assert!(!builder.finalize().contains(ip("::1")));
    }

    #[test]
    fn test_contains_binary_search_edges() {
        let mut builder = PrefixSetBuilder::new(AddressFamily::V4);
        for cidr in ["1.0.0.0/24", "3.0.0.0/24", "5.0.0.0/24", "255.255.255.255/32"] {
            builder.add_prefix(net(cidr)).unwrap();
        }
        let set = builder.finalize();
        assert!(!set.contains(ip("0.255.255.255")));
        assert!(set.contains(ip("1.0.0.0")));
        assert!(!set.contains(ip("2.0.0.0")));
        assert!(set.contains(ip("5.0.0.255")));
        assert!(!set.contains(ip("5.0.1.0")));
        assert!(set.contains(ip("255.255.255.255")));
    }

    #[test]
    fn test_subtract_edges() {
        let full = IpRange::from_net(&net("::/0"));
        let cut = IpRange::from_net(&net("::/1"));
        let rest = subtract(vec![full], &cut);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].to_prefixes(), vec![net("8000::/1")]);
    }
}
