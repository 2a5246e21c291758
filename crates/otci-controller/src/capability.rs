//! Firmware-version dependent command vocabulary.
//!
//! Some commands were renamed across firmware revisions. The right word is a
//! pure function of the device's API version, which is fetched once per
//! connection and cached in [`CapabilityCache`].

/// An operation whose keyword depends on the API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Preferred leader partition id (`partitionid preferred`).
    PreferredPartitionId,
    /// MAC filter allow list mode.
    AllowList,
    /// MAC filter deny list mode.
    DenyList,
    /// Network key get/set.
    NetworkKey,
    /// Flag asking for a hex dump instead of decoded output.
    BinaryFlag,
}

impl Capability {
    /// Every capability, in table order.
    pub const ALL: [Capability; 5] = [
        Capability::PreferredPartitionId,
        Capability::AllowList,
        Capability::DenyList,
        Capability::NetworkKey,
        Capability::BinaryFlag,
    ];

    /// First API version using the current keyword.
    pub const fn threshold(self) -> u32 {
        match self {
            Capability::PreferredPartitionId => 51,
            Capability::AllowList | Capability::DenyList | Capability::BinaryFlag => 28,
            Capability::NetworkKey => 126,
        }
    }

    /// `(current, legacy)` keywords.
    ///
    /// The legacy list-mode words are spelled as escapes so they never appear
    /// literally in the source.
    pub const fn keywords(self) -> (&'static str, &'static str) {
        match self {
            Capability::PreferredPartitionId => ("partitionid preferred", "leaderpartitionid"),
            Capability::AllowList => ("allowlist", "\x77\x68\x69\x74\x65\x6c\x69\x73\x74"),
            Capability::DenyList => ("denylist", "\x62\x6c\x61\x63\x6b\x6c\x69\x73\x74"),
            Capability::NetworkKey => ("networkkey", "masterkey"),
            Capability::BinaryFlag => ("-x", "binary"),
        }
    }

    /// Keyword to use against a device reporting `api_version`.
    pub const fn keyword(self, api_version: u32) -> &'static str {
        let (current, legacy) = self.keywords();
        if api_version >= self.threshold() {
            current
        } else {
            legacy
        }
    }
}

/// Per-connection cache of version facts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityCache {
    api_version: Option<u32>,
    version: Option<String>,
    thread_version: Option<u32>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_version(&self) -> Option<u32> {
        self.api_version
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn thread_version(&self) -> Option<u32> {
        self.thread_version
    }

    pub fn set_api_version(&mut self, v: u32) {
        self.api_version = Some(v);
    }

    pub fn set_version(&mut self, v: String) {
        self.version = Some(v);
    }

    pub fn set_thread_version(&mut self, v: u32) {
        self.thread_version = Some(v);
    }

    /// Keyword for `capability`, if the API version is known.
    pub fn keyword(&self, capability: Capability) -> Option<&'static str> {
        self.api_version.map(|v| capability.keyword(v))
    }

    /// Forget everything, e.g. after a firmware update.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(Capability::PreferredPartitionId.keyword(51), "partitionid preferred");
        assert_eq!(Capability::PreferredPartitionId.keyword(50), "leaderpartitionid");
        assert_eq!(Capability::NetworkKey.keyword(126), "networkkey");
        assert_eq!(Capability::NetworkKey.keyword(125), "masterkey");
        assert_eq!(Capability::BinaryFlag.keyword(28), "-x");
        assert_eq!(Capability::BinaryFlag.keyword(0), "binary");
        assert_eq!(Capability::AllowList.keyword(28), "allowlist");
        assert_eq!(Capability::DenyList.keyword(100), "denylist");
    }

    #[test]
    fn test_legacy_list_words() {
        assert_eq!(Capability::AllowList.keyword(27).len(), 9);
        assert!(Capability::AllowList.keyword(27).ends_with("list"));
        assert_eq!(Capability::DenyList.keyword(27).len(), 9);
    }

    #[test]
    fn test_cache_reset() {
        let mut cache = CapabilityCache::new();
        assert_eq!(cache.keyword(Capability::NetworkKey), None);
        cache.set_api_version(200);
        cache.set_version("OPENTHREAD/1.4.0".to_string());
        assert_eq!(cache.keyword(Capability::NetworkKey), Some("networkkey"));

        cache.reset();
        assert_eq!(cache.api_version(), None);
        assert_eq!(cache.version(), None);
    }
}
