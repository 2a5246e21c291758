//! Indented record-block decoder.
//!
//! Host, service and similar dumps print one unindented label line per
//! record followed by indented `key: value` lines:
//!
//! ```text
//! srp-api-test-1.default.service.arpa.
//!     deleted: false
//!     addresses: [fdde:ad00:beef:0:0:ff:fe00:fc10]
//! ```
//!
//! [`parse_record_blocks`] produces untyped [`Record`]s; the SRP server
//! decoders below convert recognized keys and reject unknown ones.

use std::collections::BTreeMap;
use std::net::Ipv6Addr;

use crate::error::{OtciError, OtciResult};
use crate::hex;
use crate::scalar::{parse_field, parse_ip6addr_str};

/// Value of one TXT entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxtValue {
    /// `key=value` entry.
    Bytes(Vec<u8>),
    /// Bare `key` entry with no value.
    Flag,
}

/// Decoded TXT record, keyed by entry name.
pub type TxtMap = BTreeMap<String, TxtValue>;

/// One labelled record with its raw fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// The unindented line that opened the record.
    pub label: String,
    /// Field values keyed by field name.
    pub fields: BTreeMap<String, String>,
}

impl Record {
    fn new(label: &str) -> Self {
        Record {
            label: label.to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Get a raw field value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Split record-block output into records.
///
/// An indented line before the first label, or one without a `": "`
/// separator, is rejected. Blank lines are ignored.
pub fn parse_record_blocks<S: AsRef<str>>(output: &[S]) -> OtciResult<Vec<Record>> {
    let mut records: Vec<Record> = Vec::new();

    for line in output {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }

        if !line.starts_with(char::is_whitespace) {
            records.push(Record::new(line));
            continue;
        }

        let record = records
            .last_mut()
            .ok_or_else(|| OtciError::unexpected(output, "indented line before the first record"))?;
        let (key, value) = line
            .trim()
            .split_once(": ")
            .ok_or_else(|| OtciError::unexpected(output, format!("expected `key: value`, got `{}`", line.trim())))?;
        record.fields.insert(key.to_string(), value.to_string());
    }

    Ok(records)
}

/// Strip the brackets from `[a, b]` and split on `, `.
///
/// `[]` yields an empty list.
pub fn parse_bracketed_list(value: &str) -> OtciResult<Vec<&str>> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or_else(|| OtciError::unexpected(&[value], "expected a bracketed list"))?;

    if inner.is_empty() {
        return Ok(Vec::new());
    }
    Ok(inner.split(", ").collect())
}

/// Decode a bracketed list of IPv6 addresses.
pub fn parse_address_list(value: &str) -> OtciResult<Vec<Ipv6Addr>> {
    parse_bracketed_list(value)?
        .into_iter()
        .map(parse_ip6addr_str)
        .collect()
}

/// Decode a TXT map such as `[txt11=76616c3131, flag]`.
pub fn parse_txt_map(value: &str) -> OtciResult<TxtMap> {
    let mut txt = TxtMap::new();
    for entry in parse_bracketed_list(value)? {
        if entry.is_empty() {
            continue;
        }
        match entry.split_once('=') {
            Some((key, hexval)) => {
                txt.insert(key.to_string(), TxtValue::Bytes(hex::decode(hexval)?));
            }
            None => {
                txt.insert(entry.to_string(), TxtValue::Flag);
            }
        }
    }
    Ok(txt)
}

fn parse_bool_field(value: &str) -> OtciResult<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(OtciError::unexpected(&[value], "expected `true` or `false`")),
    }
}

/// A host registered with the SRP server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SrpServerHost {
    /// Full host name.
    pub host: String,
    /// Whether the registration has been removed (name still reserved).
    pub deleted: Option<bool>,
    /// Registered addresses.
    pub addresses: Vec<Ipv6Addr>,
}

/// A service registered with the SRP server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SrpServerService {
    /// Full service instance name.
    pub instance: String,
    /// Whether the registration has been removed (name still reserved).
    pub deleted: Option<bool>,
    /// Addresses of the host providing the service.
    pub addresses: Vec<Ipv6Addr>,
    /// Subtype labels; empty when the firmware prints `(null)`.
    pub subtypes: Vec<String>,
    /// Service port.
    pub port: Option<u16>,
    /// SRV weight.
    pub weight: Option<u16>,
    /// SRV priority.
    pub priority: Option<u16>,
    /// Record TTL, in seconds.
    pub ttl: Option<u32>,
    /// Lease interval, in seconds.
    pub lease: Option<u32>,
    /// Key lease interval, in seconds.
    pub key_lease: Option<u32>,
    /// Full name of the host providing the service.
    pub host: Option<String>,
    /// Decoded TXT entries.
    pub txt: TxtMap,
}

/// Decode `srp server host` output.
pub fn parse_srp_server_hosts<S: AsRef<str>>(output: &[S]) -> OtciResult<Vec<SrpServerHost>> {
    parse_record_blocks(output)?
        .into_iter()
        .map(|record| {
            let mut host = SrpServerHost {
                host: record.label,
                ..Default::default()
            };
            for (key, value) in &record.fields {
                match key.as_str() {
                    "deleted" => host.deleted = Some(parse_bool_field(value)?),
                    "addresses" => host.addresses = parse_address_list(value)?,
                    _ => return Err(OtciError::unexpected(output, format!("unknown host field `{key}`"))),
                }
            }
            Ok(host)
        })
        .collect()
}

/// Decode `srp server service` output.
pub fn parse_srp_server_services<S: AsRef<str>>(output: &[S]) -> OtciResult<Vec<SrpServerService>> {
    parse_record_blocks(output)?
        .into_iter()
        .map(|record| {
            let mut service = SrpServerService {
                instance: record.label,
                ..Default::default()
            };
            for (key, value) in &record.fields {
                match key.as_str() {
                    "deleted" => service.deleted = Some(parse_bool_field(value)?),
                    "addresses" => service.addresses = parse_address_list(value)?,
                    "subtypes" if value == "(null)" => service.subtypes.clear(),
                    "subtypes" => service.subtypes = value.split(',').map(str::to_string).collect(),
                    "port" => service.port = Some(parse_field(value, 10)?),
                    "weight" => service.weight = Some(parse_field(value, 10)?),
                    "priority" => service.priority = Some(parse_field(value, 10)?),
                    "ttl" => service.ttl = Some(parse_field(value, 10)?),
                    "lease" => service.lease = Some(parse_field(value, 10)?),
                    "key-lease" => service.key_lease = Some(parse_field(value, 10)?),
                    "host" => service.host = Some(value.clone()),
                    "TXT" => service.txt = parse_txt_map(value)?,
                    _ => return Err(OtciError::unexpected(output, format!("unknown service field `{key}`"))),
                }
            }
            Ok(service)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_record() {
        let records = parse_record_blocks(&["srp-host-1", "  deleted: false", "  addresses: [2001:db8::1]"]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "srp-host-1");
        assert_eq!(records[0].get("deleted"), Some("false"));
        assert_eq!(records[0].get("addresses"), Some("[2001:db8::1]"));

        let hosts = parse_srp_server_hosts(&["srp-host-1", "  deleted: false", "  addresses: [2001:db8::1]"]).unwrap();
        assert_eq!(hosts[0].deleted, Some(false));
        assert_eq!(hosts[0].addresses, vec!["2001:db8::1".parse::<Ipv6Addr>().unwrap()]);
    }

    #[test]
    fn test_label_without_fields() {
        let records = parse_record_blocks(&["a", "b", "  k: v"]).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].fields.is_empty());
        assert_eq!(records[1].get("k"), Some("v"));
        assert_eq!(records[0].get("k"), None);
    }

    #[test]
    fn test_indented_line_first_rejected() {
        let err = parse_record_blocks(&["  deleted: true", "host"]).unwrap_err();
        assert!(matches!(err, OtciError::UnexpectedOutput { .. }));
    }

    #[test]
    fn test_value_split_once() {
        let records = parse_record_blocks(&["svc", "    host: a: b"]).unwrap();
        assert_eq!(records[0].get("host"), Some("a: b"));
    }

    #[test]
    fn test_bracketed_list() {
        assert!(parse_bracketed_list("[]").unwrap().is_empty());
        assert_eq!(parse_bracketed_list("[a, b]").unwrap(), vec!["a", "b"]);
        assert!(parse_bracketed_list("a, b").is_err());
    }

    #[test]
    fn test_txt_map() {
        let txt = parse_txt_map("[txt11=76616c3131, flag, empty=]").unwrap();
        assert_eq!(txt["txt11"], TxtValue::Bytes(b"val11".to_vec()));
        assert_eq!(txt["flag"], TxtValue::Flag);
        assert_eq!(txt["empty"], TxtValue::Bytes(Vec::new()));
        assert!(parse_txt_map("[k=abc]").is_err());
    }

    #[test]
    fn test_srp_server_services() {
        let output = [
            "ins1._test._udp.default.service.arpa.",
            "    deleted: false",
            "    subtypes: _sub1,_sub2",
            "    port: 1234",
            "    priority: 2",
            "    weight: 3",
            "    ttl: 7200",
            "    lease: 7200",
            "    key-lease: 1209600",
            "    TXT: [abc=010203, flag]",
            "    host: host1.default.service.arpa.",
            "    addresses: [fdde:ad00:beef:0:0:ff:fe00:fc10, fe80::1]",
            "ins2._test._udp.default.service.arpa.",
            "    deleted: true",
            "    subtypes: (null)",
        ];
        let services = parse_srp_server_services(&output).unwrap();
        assert_eq!(services.len(), 2);

        let s = &services[0];
        assert_eq!(s.subtypes, vec!["_sub1", "_sub2"]);
        assert_eq!(s.port, Some(1234));
        assert_eq!(s.key_lease, Some(1209600));
        assert_eq!(s.host.as_deref(), Some("host1.default.service.arpa."));
        assert_eq!(s.addresses.len(), 2);
        assert_eq!(s.txt["abc"], TxtValue::Bytes(vec![1, 2, 3]));

        assert_eq!(services[1].deleted, Some(true));
        assert!(services[1].subtypes.is_empty());
        assert_eq!(services[1].port, None);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(parse_srp_server_hosts(&["h", "  color: blue"]).is_err());
        assert!(parse_srp_server_hosts(&["h", "  deleted: maybe"]).is_err());
    }
}
