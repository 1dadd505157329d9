//! Provider-side DNS record model
//!
//! Providers hand back records of every type in a zone. Only address
//! records (A/AAAA) are interpreted; everything else stays opaque and is
//! filtered out by [`Record::parse_address`] returning
//! [`RecordParseError::NotAddress`].
//!
//! Record names are absolute (`www.example.com`, no trailing dot). Provider
//! adapters translate to and from their own relative naming with
//! [`qualify`] and [`relative_to`].

use std::net::{AddrParseError, IpAddr};
use std::time::Duration;
use thiserror::Error;

/// Record type for IPv4 addresses
pub const TYPE_A: &str = "A";

/// Record type for IPv6 addresses
pub const TYPE_AAAA: &str = "AAAA";

/// A DNS record as reported by (or sent to) a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Provider-specific record identifier, if known
    pub id: Option<String>,
    /// Absolute record name
    pub name: String,
    /// Record type as reported by the provider (e.g. "A", "TXT")
    pub record_type: String,
    /// Record content
    pub value: String,
    /// Time-to-live; `None` means provider default
    pub ttl: Option<Duration>,
}

impl Record {
    /// Build an address record, choosing A or AAAA from the IP family
    pub fn address(name: impl Into<String>, ip: IpAddr, ttl: Option<Duration>) -> Self {
        Self {
            id: None,
            name: name.into(),
            record_type: address_type(ip).to_string(),
            value: ip.to_string(),
            ttl: ttl.filter(|ttl| !ttl.is_zero()),
        }
    }

    /// Interpret this record as an address record
    pub fn parse_address(&self) -> Result<AddressRecord, RecordParseError> {
        let is_a = self.record_type.eq_ignore_ascii_case(TYPE_A);
        let is_aaaa = self.record_type.eq_ignore_ascii_case(TYPE_AAAA);
        if !is_a && !is_aaaa {
            return Err(RecordParseError::NotAddress {
                record_type: self.record_type.clone(),
            });
        }

        let ip: IpAddr =
            self.value
                .trim()
                .parse()
                .map_err(|source| RecordParseError::InvalidAddress {
                    name: self.name.clone(),
                    value: self.value.clone(),
                    source,
                })?;

        if (is_a && !ip.is_ipv4()) || (is_aaaa && !ip.is_ipv6()) {
            return Err(RecordParseError::FamilyMismatch {
                name: self.name.clone(),
                record_type: self.record_type.clone(),
                ip,
            });
        }

        Ok(AddressRecord {
            name: self.name.clone(),
            ip,
            ttl: self.ttl,
        })
    }
}

/// A record successfully parsed as A or AAAA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    /// Absolute record name
    pub name: String,
    /// Address held by the record
    pub ip: IpAddr,
    /// Time-to-live, if the provider reported one
    pub ttl: Option<Duration>,
}

/// Why a record could not be read as an address record
#[derive(Debug, Error)]
pub enum RecordParseError {
    /// The record is of another type (TXT, CNAME, MX, ...)
    #[error("record type {record_type} is not an address record")]
    NotAddress { record_type: String },

    /// The record claims to be an address but its value is not an IP literal
    #[error("record {name} has invalid address {value:?}: {source}")]
    InvalidAddress {
        name: String,
        value: String,
        #[source]
        source: AddrParseError,
    },

    /// An A record holding IPv6 content or an AAAA record holding IPv4
    #[error("record {name} of type {record_type} holds mismatched address {ip}")]
    FamilyMismatch {
        name: String,
        record_type: String,
        ip: IpAddr,
    },
}

impl RecordParseError {
    /// Whether this is the expected "not an address record" outcome
    pub fn is_not_address(&self) -> bool {
        matches!(self, Self::NotAddress { .. })
    }
}

/// Record type for an IP address
pub fn address_type(ip: IpAddr) -> &'static str {
    match ip {
        IpAddr::V4(_) => TYPE_A,
        IpAddr::V6(_) => TYPE_AAAA,
    }
}

/// Lowercase a DNS name and strip any trailing dot
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Compare two DNS names ignoring case and trailing dots
pub fn names_match(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

/// Turn a possibly relative name into an absolute one within `zone`
///
/// `@` and the empty string denote the zone apex. Names already inside the
/// zone are returned normalized.
pub fn qualify(name: &str, zone: &str) -> String {
    let zone = normalize_name(zone);
    let name = normalize_name(name);

    if name.is_empty() || name == "@" || name == zone {
        return zone;
    }
    if name.ends_with(&format!(".{zone}")) {
        return name;
    }
    format!("{name}.{zone}")
}

/// Turn an absolute name into one relative to `zone`, `@` for the apex
///
/// Names outside the zone are returned unchanged (normalized).
pub fn relative_to(name: &str, zone: &str) -> String {
    let zone = normalize_name(zone);
    let name = normalize_name(name);

    if name == zone {
        return "@".to_string();
    }
    match name.strip_suffix(&format!(".{zone}")) {
        Some(relative) => relative.to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(record_type: &str, value: &str) -> Record {
        Record {
            id: None,
            name: "node.example.com".to_string(),
            record_type: record_type.to_string(),
            value: value.to_string(),
            ttl: None,
        }
    }

    #[test]
    fn parses_a_and_aaaa() {
        let a = record("A", "10.0.0.1").parse_address().unwrap();
        assert_eq!(a.ip, "10.0.0.1".parse::<IpAddr>().unwrap());

        let aaaa = record("aaaa", "2001:db8::1").parse_address().unwrap();
        assert_eq!(aaaa.ip, "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn other_types_are_not_address() {
        for kind in ["TXT", "CNAME", "MX", "NS"] {
            let err = record(kind, "whatever").parse_address().unwrap_err();
            assert!(err.is_not_address(), "{kind} should be NotAddress");
        }
    }

    #[test]
    fn garbage_value_is_a_real_error() {
        let err = record("A", "not-an-ip").parse_address().unwrap_err();
        assert!(!err.is_not_address());
    }

    #[test]
    fn family_mismatch_is_a_real_error() {
        let err = record("A", "2001:db8::1").parse_address().unwrap_err();
        assert!(matches!(err, RecordParseError::FamilyMismatch { .. }));
    }

    #[test]
    fn address_builder_picks_type_and_drops_zero_ttl() {
        let v6 = Record::address("h.example.com", "::1".parse().unwrap(), Some(Duration::ZERO));
        assert_eq!(v6.record_type, "AAAA");
        assert_eq!(v6.ttl, None);

        let v4 = Record::address(
            "h.example.com",
            "1.2.3.4".parse().unwrap(),
            Some(Duration::from_secs(300)),
        );
        assert_eq!(v4.record_type, "A");
        assert_eq!(v4.ttl, Some(Duration::from_secs(300)));
    }

    #[test]
    fn name_helpers() {
        assert!(names_match("Node.Example.com.", "node.example.com"));
        assert_eq!(qualify("@", "example.com"), "example.com");
        assert_eq!(qualify("", "example.com"), "example.com");
        assert_eq!(qualify("node", "example.com"), "node.example.com");
        assert_eq!(qualify("node.example.com", "example.com"), "node.example.com");
        assert_eq!(relative_to("example.com", "example.com"), "@");
        assert_eq!(relative_to("a.b.example.com", "example.com."), "a.b");
        assert_eq!(relative_to("other.org", "example.com"), "other.org");
    }
}
