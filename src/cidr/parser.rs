//! Text to [`RangeItem`]: CIDR, single address or hyphen range.

use std::net::IpAddr;
use std::str::FromStr;

use super::range::{addr_to_bits, net_from_bits, AddressFamily, IpRange, RangeItem};
use crate::{Error, Result};

/// Parse `text` as a CIDR network, a bare address or a `start-end` range.
///
/// The family follows the literal: `::ffff:1.2.3.4` stays IPv6 here.
/// Networks come back with host bits cleared.
///
/// # Examples
/// ```
/// use geodat::cidr::{parse_range, RangeItem};
///
/// let item = parse_range("192.168.1.7/24").unwrap();
/// assert_eq!(item.to_string(), "192.168.1.0/24");
/// assert!(matches!(parse_range("10.0.0.5-10.0.0.9"), Ok(RangeItem::Range(_))));
/// ```
pub fn parse_range(text: &str) -> Result<RangeItem> {
    if let Some((addr, len)) = text.split_once('/') {
        return parse_cidr(text, addr, len);
    }

    if let Some(addr) = parse_ip(text) {
        return Ok(RangeItem::Addr(addr));
    }

    if let Some((start, end)) = text.split_once('-') {
        let (start, end) = match (parse_ip(start.trim()), parse_ip(end.trim())) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(Error::InvalidRange(text.to_string())),
        };
        if AddressFamily::of(&start) != AddressFamily::of(&end) {
            return Err(Error::InvalidRangeOrder(text.to_string()));
        }
        return IpRange::new(start, end)
            .map(RangeItem::Range)
            .map_err(|_| Error::InvalidRangeOrder(text.to_string()));
    }

    Err(Error::NotAddress(text.to_string()))
}

fn parse_cidr(text: &str, addr: &str, len: &str) -> Result<RangeItem> {
    let addr = parse_ip(addr).ok_or_else(|| Error::InvalidCidr(text.to_string()))?;
    let family = AddressFamily::of(&addr);

    if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidCidr(text.to_string()));
    }
    let prefix_len: u8 = match len.parse() {
        Ok(prefix_len) if prefix_len <= family.bits() => prefix_len,
        Ok(prefix_len) => {
            return Err(Error::InvalidPrefixLength {
                family,
                len: prefix_len,
            })
        }
        // Digits only, so the value overflowed u8.
        Err(_) => {
            return Err(Error::InvalidPrefixLength {
                family,
                len: u8::MAX,
            })
        }
    };

    net_from_bits(family, addr_to_bits(addr), prefix_len)
        .map(|net| RangeItem::Net(net.trunc()))
        .ok_or_else(|| Error::InvalidCidr(text.to_string()))
}

fn parse_ip(text: &str) -> Option<IpAddr> {
    text.parse().ok()
}

impl FromStr for RangeItem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_range(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_cidr() {
        let range = parse_range("192.168.1.0/24").unwrap().to_range();
        assert_eq!(range.start(), ip("192.168.1.0"));
        assert_eq!(range.end(), ip("192.168.1.255"));
        assert_eq!(range.family(), AddressFamily::V4);
    }

    #[test]
    fn test_parse_cidr_v6() {
        let item = parse_range("2001:db8::1/32").unwrap();
        assert_eq!(item.to_string(), "2001:db8::/32");
        assert_eq!(item.family(), AddressFamily::V6);
    }

    #[test]
    fn test_prefix_length_bounds() {
        assert!(parse_range("10.0.0.0/32").is_ok());
        assert!(matches!(
            parse_range("10.0.0.0/33"),
            Err(Error::InvalidPrefixLength {
                family: AddressFamily::V4,
                len: 33
            })
        ));
        assert!(parse_range("::/128").is_ok());
        assert!(matches!(
            parse_range("::/129"),
            Err(Error::InvalidPrefixLength {
                family: AddressFamily::V6,
                len: 129
            })
        ));
        assert!(matches!(
            parse_range("::/1000"),
            Err(Error::InvalidPrefixLength { .. })
        ));
    }

    #[test]
    fn test_bad_cidr() {
        assert!(matches!(parse_range("10.0.0/8"), Err(Error::InvalidCidr(_))));
        assert!(matches!(parse_range("10.0.0.0/"), Err(Error::InvalidCidr(_))));
        assert!(matches!(parse_range("10.0.0.0/-1"), Err(Error::InvalidCidr(_))));
        assert!(matches!(parse_range("10.0.0.0/x"), Err(Error::InvalidCidr(_))));
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(
            parse_range("8.8.8.8").unwrap(),
            RangeItem::Addr(ip("8.8.8.8"))
        );
        assert_eq!(
            parse_range("::ffff:1.2.3.4").unwrap().family(),
            AddressFamily::V6
        );
    }

    #[test]
    fn test_parse_hyphen_range() {
        let range = parse_range("10.0.0.5-10.0.0.9").unwrap().to_range();
        assert_eq!(range.start(), ip("10.0.0.5"));
        assert_eq!(range.end(), ip("10.0.0.9"));
        let prefixes: Vec<String> = range.to_prefixes().iter().map(|n| n.to_string()).collect();
        assert_eq!(prefixes, vec!["10.0.0.5/32", "10.0.0.6/31", "10.0.0.8/31"]);
    }

    #[test]
    fn test_parse_reversed_range() {
        assert!(matches!(
            parse_range("10.0.0.9-10.0.0.5"),
            Err(Error::InvalidRangeOrder(_))
        ));
    }

    #[test]
    fn test_parse_mixed_family_range() {
        assert!(matches!(
            parse_range("10.0.0.1-::1"),
            Err(Error::InvalidRangeOrder(_))
        ));
    }

    #[test]
    fn test_parse_bad_range_endpoint() {
        assert!(matches!(
            parse_range("10.0.0.1-10.0.0"),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_not_an_address() {
        assert!(matches!(parse_range("example.com"), Err(Error::NotAddress(_))));
        assert!(matches!(parse_range(""), Err(Error::NotAddress(_))));
    }

    #[test]
    fn test_from_str() {
        let item: RangeItem = "10.0.0.0/8".parse().unwrap();
        let net: ipnet::IpNet = "10.0.0.0/8".parse().unwrap();
        assert_eq!(item.to_prefixes(), vec![net]);
    }
}
