//! Domain rules carried in the payload of a GeoSite record.
//!
//! Field 2 of the payload holds one domain message each: rule type in
//! field 1, value in field 2 and repeated attributes in field 3. An
//! attribute has a key in field 1 and an optional bool (field 2) or
//! integer (field 3) value.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::binary::fields::{put_bytes, put_varint, Fields, Value};
use crate::{Error, Result};

const DOMAIN_FIELD: u64 = 2;
const DOMAIN_TYPE_FIELD: u64 = 1;
const DOMAIN_VALUE_FIELD: u64 = 2;
const DOMAIN_ATTRIBUTE_FIELD: u64 = 3;

const ATTRIBUTE_KEY_FIELD: u64 = 1;
const ATTRIBUTE_BOOL_FIELD: u64 = 2;
const ATTRIBUTE_INT_FIELD: u64 = 3;

/// How a domain rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
    /// Substring of the host name
    Plain,
    /// Regular expression over the host name
    Regex,
    /// The domain and all of its subdomains
    Domain,
    /// Exactly this host name
    Full,
}

impl DomainType {
    fn from_wire(value: u64) -> Option<Self> {
        match value {
            0 => Some(DomainType::Plain),
            1 => Some(DomainType::Regex),
            2 => Some(DomainType::Domain),
            3 => Some(DomainType::Full),
            _ => None,
        }
    }

    fn wire(self) -> u64 {
        match self {
            DomainType::Plain => 0,
            DomainType::Regex => 1,
            DomainType::Domain => 2,
            DomainType::Full => 3,
        }
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainType::Plain => write!(f, "keyword"),
            DomainType::Regex => write!(f, "regexp"),
            DomainType::Domain => write!(f, "domain"),
            DomainType::Full => write!(f, "full"),
        }
    }
}

/// Typed value of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
}

/// Tag attached to a domain rule, such as `ads` or `cn`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: Option<AttributeValue>,
}

impl Attribute {
    /// Attribute with a key and no value.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// One domain rule of a site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Domain {
    pub kind: DomainType,
    pub value: String,
    pub attributes: Vec<Attribute>,
}

impl Domain {
    /// Rule without attributes.
    pub fn new(kind: DomainType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute key.
    pub fn with_attribute(mut self, key: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(key));
        self
    }

    /// Whether an attribute with `key` is attached.
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.iter().any(|attr| attr.key == key)
    }
}

/// Collect every domain rule of a GeoSite payload, in payload order.
pub fn decode_domains(payload: &[u8]) -> Result<Vec<Domain>> {
    let mut domains = Vec::new();
    let mut fields = Fields::new(payload);
    while let Some((field, value)) = fields.next_field()? {
        if let (DOMAIN_FIELD, Value::Bytes(message)) = (field, value) {
            domains.push(decode_domain(message)?);
        }
    }
    Ok(domains)
}

fn decode_domain(message: &[u8]) -> Result<Domain> {
    let mut domain = Domain::new(DomainType::Plain, String::new());
    let mut fields = Fields::new(message);
    while let Some((field, value)) = fields.next_field()? {
        match (field, value) {
            (DOMAIN_TYPE_FIELD, Value::Varint(kind)) => {
                domain.kind = DomainType::from_wire(kind)
                    .ok_or_else(|| Error::InvalidDomain(format!("type {}", kind)))?;
            }
            (DOMAIN_VALUE_FIELD, Value::Bytes(bytes)) => domain.value = utf8(bytes)?,
            (DOMAIN_ATTRIBUTE_FIELD, Value::Bytes(bytes)) => {
                domain.attributes.push(decode_attribute(bytes)?)
            }
            _ => {}
        }
    }
    Ok(domain)
}

fn decode_attribute(message: &[u8]) -> Result<Attribute> {
    let mut attribute = Attribute::new(String::new());
    let mut fields = Fields::new(message);
    while let Some((field, value)) = fields.next_field()? {
        match (field, value) {
            (ATTRIBUTE_KEY_FIELD, Value::Bytes(bytes)) => attribute.key = utf8(bytes)?,
            (ATTRIBUTE_BOOL_FIELD, Value::Varint(v)) => {
                attribute.value = Some(AttributeValue::Bool(v != 0))
            }
            (ATTRIBUTE_INT_FIELD, Value::Varint(v)) => {
                attribute.value = Some(AttributeValue::Int(v as i64))
            }
            _ => {}
        }
    }
    Ok(attribute)
}

fn utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| Error::InvalidDomain(format!("non UTF-8 text {:02x?}", bytes)))
}

/// Encode `domains` as the domain fields of a GeoSite payload.
///
/// Default values are left out, so a plain rule carries no type field.
pub fn encode_domains(domains: &[Domain]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut message = Vec::new();
    let mut attribute = Vec::new();
    for domain in domains {
        message.clear();
        if domain.kind != DomainType::Plain {
            put_varint(&mut message, DOMAIN_TYPE_FIELD, domain.kind.wire());
        }
        if !domain.value.is_empty() {
            put_bytes(&mut message, DOMAIN_VALUE_FIELD, domain.value.as_bytes());
        }
        for attr in &domain.attributes {
            attribute.clear();
            if !attr.key.is_empty() {
                put_bytes(&mut attribute, ATTRIBUTE_KEY_FIELD, attr.key.as_bytes());
            }
            match attr.value {
                Some(AttributeValue::Bool(v)) => {
                    put_varint(&mut attribute, ATTRIBUTE_BOOL_FIELD, u64::from(v))
                }
                Some(AttributeValue::Int(v)) => {
                    put_varint(&mut attribute, ATTRIBUTE_INT_FIELD, v as u64)
                }
                None => {}
            }
            put_bytes(&mut message, DOMAIN_ATTRIBUTE_FIELD, &attribute);
        }
        put_bytes(&mut out, DOMAIN_FIELD, &message);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_domain() {
        // field 2 { type: Full, value: "a.io" }
        let payload = [0x12, 0x08, 0x08, 0x03, 0x12, 0x04, b'a', b'.', b'i', b'o'];
        assert_eq!(
            decode_domains(&payload).unwrap(),
            vec![Domain::new(DomainType::Full, "a.io")]
        );
    }

    #[test]
    fn test_encode_layout() {
        let domain = Domain::new(DomainType::Domain, "x.cn").with_attribute("ads");
        assert_eq!(
            encode_domains(&[domain]),
            vec![
                0x12, 0x0F, // domain message
                0x08, 0x02, // type: Domain
                0x12, 0x04, b'x', b'.', b'c', b'n', // value
                0x1A, 0x05, 0x0A, 0x03, b'a', b'd', b's', // attribute { key: "ads" }
            ]
        );
    }

    #[test]
    fn test_plain_type_is_default() {
        let payload = encode_domains(&[Domain::new(DomainType::Plain, "google")]);
        assert_eq!(payload, vec![0x12, 0x08, 0x12, 0x06, b'g', b'o', b'o', b'g', b'l', b'e']);
        assert_eq!(decode_domains(&payload).unwrap()[0].kind, DomainType::Plain);
    }

    #[test]
    fn test_attribute_values_survive() {
        let mut domain = Domain::new(DomainType::Regex, r"^ad\d+\.");
        domain.attributes = vec![
            Attribute {
                key: "ads".to_string(),
                value: Some(AttributeValue::Bool(true)),
            },
            Attribute {
                key: "weight".to_string(),
                value: Some(AttributeValue::Int(-3)),
            },
            Attribute::new("cn"),
        ];
        let decoded = decode_domains(&encode_domains(&[domain.clone()])).unwrap();
        assert_eq!(decoded, vec![domain]);
        assert!(decoded[0].has_attribute("cn"));
        assert!(!decoded[0].has_attribute("us"));
    }

    #[test]
    fn test_skips_other_fields() {
        let mut payload = vec![0x0A, 0x02, b'C', b'N']; // country code
        payload.extend(encode_domains(&[Domain::new(DomainType::Full, "qq.com")]));
        payload.extend([0x18, 0x01]); // unknown varint field
        assert_eq!(decode_domains(&payload).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let payload = [0x12, 0x02, 0x08, 0x07];
        assert!(matches!(
            decode_domains(&payload),
            Err(Error::InvalidDomain(_))
        ));
    }

    #[test]
    fn test_non_utf8_value_rejected() {
        let payload = [0x12, 0x04, 0x12, 0x02, 0xFF, 0xFE];
        assert!(matches!(
            decode_domains(&payload),
            Err(Error::InvalidDomain(_))
        ));
    }

    #[test]
    fn test_truncated_domain() {
        let payload = [0x12, 0x08, 0x08, 0x03, 0x12, 0x04, b'a'];
        assert!(matches!(
            decode_domains(&payload),
            Err(Error::TruncatedRecord { .. })
        ));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(DomainType::Plain.to_string(), "keyword");
        assert_eq!(DomainType::Regex.to_string(), "regexp");
        assert_eq!(DomainType::Full.to_string(), "full");
    }
}
