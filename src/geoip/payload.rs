//! CIDR list carried in the payload of a GeoIP record.
//!
//! The payload is a sequence of protobuf fields. Field 2 holds one CIDR
//! message each (`ip` bytes in field 1, varint `prefix` in field 2); every
//! other field is skipped by wire type.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::binary::fields::{Fields, Value, WIRE_LEN, WIRE_VARINT};
use crate::binary::{encode_varint, varint_len};
use crate::cidr::AddressFamily;
use crate::{Error, Result};

const CIDR_FIELD: u64 = 2;
const CIDR_IP_FIELD: u64 = 1;
const CIDR_PREFIX_FIELD: u64 = 2;

/// Collect every CIDR of a GeoIP payload, in payload order.
pub fn decode_cidrs(payload: &[u8]) -> Result<Vec<IpNet>> {
    let mut cidrs = Vec::new();
    let mut fields = Fields::new(payload);
    while let Some((field, value)) = fields.next_field()? {
        if let (CIDR_FIELD, Value::Bytes(message)) = (field, value) {
            cidrs.push(decode_cidr(message)?);
        }
    }
    Ok(cidrs)
}

fn decode_cidr(message: &[u8]) -> Result<IpNet> {
    let mut ip: &[u8] = &[];
    let mut prefix = 0u64;
    let mut fields = Fields::new(message);
    while let Some((field, value)) = fields.next_field()? {
        match (field, value) {
            (CIDR_IP_FIELD, Value::Bytes(bytes)) => ip = bytes,
            (CIDR_PREFIX_FIELD, Value::Varint(value)) => prefix = value,
            _ => {}
        }
    }

    let family = match ip.len() {
        4 => AddressFamily::V4,
        16 => AddressFamily::V6,
        _ => return Err(Error::InvalidIp(format!("{:02x?}", ip))),
    };
    let len = match u8::try_from(prefix) {
        Ok(len) if len <= family.bits() => len,
        _ => {
            return Err(Error::InvalidPrefixLength {
                family,
                len: u8::try_from(prefix).unwrap_or(u8::MAX),
            })
        }
    };

    let net = match <[u8; 16]>::try_from(ip) {
        Ok(octets) => Ipv6Net::new(Ipv6Addr::from(octets), len).map(IpNet::V6),
        Err(_) => {
            let octets = [ip[0], ip[1], ip[2], ip[3]];
            Ipv4Net::new(Ipv4Addr::from(octets), len).map(IpNet::V4)
        }
    };
    net.map_err(|_| Error::InvalidPrefixLength { family, len })
}

/// Encode `prefixes` as the CIDR fields of a GeoIP payload.
pub fn encode_cidrs(prefixes: &[IpNet]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefixes.len() * 10);
    for net in prefixes {
        let ip = match net.network() {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        let prefix = u64::from(net.prefix_len());
        let message_len = 2 + ip.len() + 1 + varint_len(prefix);

        out.push(((CIDR_FIELD << 3) | WIRE_LEN) as u8);
        encode_varint(message_len as u64, &mut out);
        out.push(((CIDR_IP_FIELD << 3) | WIRE_LEN) as u8);
        out.push(ip.len() as u8);
        out.extend_from_slice(&ip);
        out.push(((CIDR_PREFIX_FIELD << 3) | WIRE_VARINT) as u8);
        encode_varint(prefix, &mut out);
    }
    out
}
