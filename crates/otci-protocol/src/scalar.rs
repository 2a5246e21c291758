//! Single-value decoders.
//!
//! Most getters reply with exactly one payload line holding a string, an
//! integer, a flag word or an address. These decoders enforce the line count
//! and the value shape.

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use crate::error::{OtciError, OtciResult};
use crate::hex;

/// Require exactly one payload line and return it.
pub fn parse_str<S: AsRef<str>>(output: &[S]) -> OtciResult<&str> {
    match output {
        [line] => Ok(line.as_ref()),
        _ => Err(OtciError::unexpected(output, format!("expected 1 line, got {}", output.len()))),
    }
}

/// Parse an integer the way the console prints them.
///
/// Surrounding whitespace and a sign are accepted; base 16 also accepts a
/// `0x` prefix. Returns `None` for anything non-numeric.
pub fn parse_int_str(s: &str, radix: u32) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits = if radix == 16 {
        digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits)
    } else {
        digits
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    let value = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

/// Parse a single-line integer reply in the given base.
pub fn parse_int<S: AsRef<str>>(output: &[S], radix: u32) -> OtciResult<i64> {
    let line = parse_str(output)?;
    parse_int_str(line, radix)
        .ok_or_else(|| OtciError::unexpected(output, format!("expected a base-{radix} integer")))
}

/// Parse a single-line integer reply into a narrower integer type.
pub fn parse_int_as<T, S>(output: &[S], radix: u32) -> OtciResult<T>
where
    T: TryFrom<i64>,
    S: AsRef<str>,
{
    let value = parse_int(output, radix)?;
    T::try_from(value).map_err(|_| OtciError::unexpected(output, format!("integer {value} out of range")))
}

/// Parse one cell or field value as an integer of type `T`.
pub fn parse_field<T: TryFrom<i64>>(value: &str, radix: u32) -> OtciResult<T> {
    parse_int_str(value, radix)
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| OtciError::unexpected(&[value], format!("expected a base-{radix} integer")))
}

/// Parse a single line of whitespace-separated integers.
pub fn parse_int_list<S: AsRef<str>>(output: &[S]) -> OtciResult<Vec<i64>> {
    let line = parse_str(output)?;
    line.split_whitespace()
        .map(|word| parse_int_str(word, 10).ok_or_else(|| OtciError::unexpected(output, "expected integers")))
        .collect()
}

/// Map a single-line reply through a fixed vocabulary.
///
/// The line must equal one of the words exactly.
pub fn parse_values<T: Clone, S: AsRef<str>>(output: &[S], vocabulary: &[(&str, T)]) -> OtciResult<T> {
    let line = parse_str(output)?;
    vocabulary
        .iter()
        .find(|(word, _)| *word == line)
        .map(|(_, value)| value.clone())
        .ok_or_else(|| OtciError::unexpected(output, format!("unrecognized value `{line}`")))
}

/// Decode an `Enabled`/`Disabled` reply.
pub fn parse_enabled_or_disabled<S: AsRef<str>>(output: &[S]) -> OtciResult<bool> {
    parse_values(output, &[("Enabled", true), ("Disabled", false)])
}

/// Decode a `true`/`false` reply.
pub fn parse_true_or_false<S: AsRef<str>>(output: &[S]) -> OtciResult<bool> {
    parse_values(output, &[("true", true), ("false", false)])
}

/// Decode a 64-bit hex identifier (extended address, EUI-64, ext PAN ID, IID).
pub fn parse_hex64<S: AsRef<str>>(output: &[S]) -> OtciResult<String> {
    let line = parse_str(output)?;
    if hex::is_valid_len(line, 8) {
        Ok(line.to_string())
    } else {
        Err(OtciError::unexpected(output, "expected 16 hex digits"))
    }
}

/// Decode a 128-bit network key.
pub fn parse_network_key<S: AsRef<str>>(output: &[S]) -> OtciResult<String> {
    let line = parse_str(output)?;
    if hex::is_valid_len(line, 16) {
        Ok(line.to_string())
    } else {
        Err(OtciError::unexpected(output, "expected 32 hex digits"))
    }
}

/// Decode a single-line hex blob into bytes.
pub fn parse_hex_bytes<S: AsRef<str>>(output: &[S]) -> OtciResult<Vec<u8>> {
    let line = parse_str(output)?;
    hex::decode(line).map_err(|_| OtciError::unexpected(output, "expected a hex string"))
}

/// Decode one IPv6 address.
pub fn parse_ip6addr_str(s: &str) -> OtciResult<Ipv6Addr> {
    Ipv6Addr::from_str(s.trim()).map_err(|_| OtciError::unexpected(&[s], "expected an IPv6 address"))
}

/// Decode a single-line IPv6 address reply.
pub fn parse_ip6addr<S: AsRef<str>>(output: &[S]) -> OtciResult<Ipv6Addr> {
    parse_ip6addr_str(parse_str(output)?)
}

/// Decode one IPv6 address per line.
pub fn parse_ip6addr_list<S: AsRef<str>>(output: &[S]) -> OtciResult<Vec<Ipv6Addr>> {
    output.iter().map(|line| parse_ip6addr_str(line.as_ref())).collect()
}

/// An IPv6 prefix such as `fdde:ad00:beef:0::/64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ip6Prefix {
    /// Network address with all host bits clear.
    pub addr: Ipv6Addr,
    /// Prefix length in bits.
    pub len: u8,
}

impl Ip6Prefix {
    /// Create a prefix, rejecting lengths over 128 and set host bits.
    pub fn new(addr: Ipv6Addr, len: u8) -> Option<Self> {
        if len > 128 {
            return None;
        }
        let mask = if len == 0 { 0 } else { u128::MAX << (128 - u32::from(len)) };
        if u128::from(addr) & !mask != 0 {
            return None;
        }
        Some(Ip6Prefix { addr, len })
    }
}

impl FromStr for Ip6Prefix {
    type Err = OtciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || OtciError::unexpected(&[s], "expected an IPv6 prefix");
        let (addr, len) = s.trim().split_once('/').ok_or_else(err)?;
        let addr = Ipv6Addr::from_str(addr).map_err(|_| err())?;
        let len = len.parse::<u8>().map_err(|_| err())?;
        Ip6Prefix::new(addr, len).ok_or_else(err)
    }
}

impl fmt::Display for Ip6Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

/// Decode a single-line IPv6 prefix reply.
pub fn parse_prefix<S: AsRef<str>>(output: &[S]) -> OtciResult<Ip6Prefix> {
    parse_str(output)?
        .parse()
        .map_err(|_| OtciError::unexpected(output, "expected an IPv6 prefix"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_str_requires_one_line() {
        assert_eq!(parse_str(&["leader"]).unwrap(), "leader");
        assert!(parse_str::<&str>(&[]).is_err());
        assert!(parse_str(&["a", "b"]).is_err());
    }

    #[test]
    fn test_parse_int_bases() {
        assert_eq!(parse_int(&["15"], 10).unwrap(), 15);
        assert_eq!(parse_int(&["0xface"], 16).unwrap(), 0xface);
        assert_eq!(parse_int(&["5400"], 16).unwrap(), 0x5400);
        assert_eq!(parse_int(&[" -46 "], 10).unwrap(), -46);
        assert!(parse_int(&["OPENTHREAD/1.3.0"], 10).is_err());
        assert!(parse_int(&[""], 10).is_err());
        assert!(parse_int(&["0x10"], 10).is_err());
    }

    #[test]
    fn test_parse_int_as_range() {
        assert_eq!(parse_int_as::<u16, _>(&["0xffff"], 16).unwrap(), 0xffff);
        assert!(parse_int_as::<u8, _>(&["256"], 10).is_err());
    }

    #[test]
    fn test_parse_int_list() {
        assert_eq!(parse_int_list(&["49152 49153"]).unwrap(), vec![49152, 49153]);
        assert!(parse_int_list(&["1 x"]).is_err());
        assert!(parse_int_list(&[""]).unwrap().is_empty());
    }

    #[test]
    fn test_parse_enabled_or_disabled() {
        assert!(parse_enabled_or_disabled(&["Enabled"]).unwrap());
        assert!(!parse_enabled_or_disabled(&["Disabled"]).unwrap());
        assert!(parse_enabled_or_disabled(&["enabled"]).is_err());
        assert!(parse_enabled_or_disabled(&["Enabled!"]).is_err());
    }

    #[test]
    fn test_parse_hex64() {
        assert_eq!(parse_hex64(&["dead00beef00cafe"]).unwrap(), "dead00beef00cafe");
        assert!(parse_hex64(&["dead00beef00caf"]).is_err());
    }

    #[test]
    fn test_parse_network_key() {
        assert!(parse_network_key(&["00112233445566778899aabbccddeeff"]).is_ok());
        assert!(parse_network_key(&["0011"]).is_err());
    }

    #[test]
    fn test_parse_prefix() {
        let prefix = parse_prefix(&["fdde:ad00:beef:0::/64"]).unwrap();
        assert_eq!(prefix.len, 64);
        assert_eq!(prefix.to_string(), "fdde:ad00:beef::/64");
        assert!(parse_prefix(&["fdde:ad00:beef:0::1/64"]).is_err());
        assert!(parse_prefix(&["fdde::/129"]).is_err());
    }

    #[test]
    fn test_parse_ip6addr_list() {
        let addrs = parse_ip6addr_list(&["fe80::1", "fdde:ad00:beef:0:0:ff:fe00:fc00"]).unwrap();
        assert_eq!(addrs.len(), 2);
        assert!(parse_ip6addr_list(&["not-an-address"]).is_err());
    }
}
