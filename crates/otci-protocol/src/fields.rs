//! Flat `Key: value` block decoder (leader data, datasets, counters, ...).

use crate::error::{OtciError, OtciResult};
use crate::scalar::parse_field;

/// Ordered `Key: value` pairs from one reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues {
    entries: Vec<(String, String)>,
}

impl KeyValues {
    /// Split every line once on `": "`. Keys are trimmed so nested counter
    /// lines keep their names.
    pub fn parse<S: AsRef<str>>(output: &[S]) -> OtciResult<KeyValues> {
        let entries = output
            .iter()
            .map(|line| {
                let line = line.as_ref();
                let (key, value) = line
                    .split_once(": ")
                    .or_else(|| line.strip_suffix(':').map(|key| (key, "")))
                    .ok_or_else(|| OtciError::unexpected(output, format!("expected `Key: value`, got `{line}`")))?;
                Ok((key.trim().to_string(), value.trim().to_string()))
            })
            .collect::<OtciResult<Vec<_>>>()?;
        Ok(KeyValues { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Required value for `key`.
    pub fn require(&self, key: &str) -> OtciResult<&str> {
        self.get(key)
            .ok_or_else(|| OtciError::unexpected(&[key], "missing required field"))
    }

    /// Required integer value for `key`.
    pub fn int<T: TryFrom<i64>>(&self, key: &str, radix: u32) -> OtciResult<T> {
        parse_field(self.require(key)?, radix)
    }

    /// Optional integer value for `key`.
    pub fn int_opt<T: TryFrom<i64>>(&self, key: &str, radix: u32) -> OtciResult<Option<T>> {
        self.get(key).map(|v| parse_field(v, radix)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leader_data() {
        let kv = KeyValues::parse(&[
            "Partition ID: 1077744240",
            "Weighting: 64",
            "Data Version: 109",
            "Stable Data Version: 211",
            "Leader Router ID: 60",
        ])
        .unwrap();
        assert_eq!(kv.len(), 5);
        assert_eq!(kv.int::<u32>("Partition ID", 10).unwrap(), 1077744240);
        assert_eq!(kv.int::<u8>("Leader Router ID", 10).unwrap(), 60);
        assert!(kv.int::<u8>("Missing", 10).is_err());
    }

    #[test]
    fn test_split_once_and_nested_keys() {
        let kv = KeyValues::parse(&["Mesh Local Prefix: fd3d::/64", "TxTotal: 10", "    TxUnicast: 3", "Mac:"]).unwrap();
        assert_eq!(kv.get("TxUnicast"), Some("3"));
        assert_eq!(kv.get("Mac"), Some(""));
        assert_eq!(kv.int_opt::<u32>("RxTotal", 10).unwrap(), None);
    }

    #[test]
    fn test_malformed_line_rejected() {
        assert!(KeyValues::parse(&["no separator here"]).is_err());
    }
}
