//! MAC address filter (allow and deny lists).

use otci_protocol::{hex, CommandLine, OtciResult};
use otci_transport::Transport;

use super::Otci;
use crate::capability::Capability;

/// Which list the address filter enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacFilterMode {
    Allow,
    Deny,
}

impl MacFilterMode {
    fn capability(self) -> Capability {
        match self {
            MacFilterMode::Allow => Capability::AllowList,
            MacFilterMode::Deny => Capability::DenyList,
        }
    }
}

/// One filtered extended address, optionally with a fixed RSSI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacFilterEntry {
    pub extaddr: String,
    pub rssi: Option<i8>,
}

impl MacFilterEntry {
    pub fn new(extaddr: impl Into<String>) -> Self {
        MacFilterEntry {
            extaddr: extaddr.into(),
            rssi: None,
        }
    }

    pub fn with_rssi(mut self, rssi: i8) -> Self {
        self.rssi = Some(rssi);
        self
    }
}

impl<T: Transport> Otci<T> {
    /// Turn the address filter on in `mode`.
    pub fn enable_mac_filter(&mut self, mode: MacFilterMode) -> OtciResult<()> {
        let keyword = self.keyword(mode.capability())?;
        self.run(format!("macfilter addr {keyword}"))
    }

    pub fn disable_mac_filter(&mut self) -> OtciResult<()> {
        self.run("macfilter addr disable")
    }

    pub fn add_mac_filter_entry(&mut self, entry: &MacFilterEntry) -> OtciResult<()> {
        hex::validate_hex64(&entry.extaddr)?;
        self.run(CommandLine::new("macfilter addr add").arg(&entry.extaddr).opt_arg(entry.rssi))
    }

    pub fn remove_mac_filter_entry(&mut self, extaddr: &str) -> OtciResult<()> {
        hex::validate_hex64(extaddr)?;
        self.run(format!("macfilter addr remove {extaddr}"))
    }

    pub fn clear_mac_filter(&mut self) -> OtciResult<()> {
        self.run("macfilter addr clear")
    }

    /// Replace the filter list. `None` clears and disables the filter;
    /// otherwise the filter is enabled in `mode` with exactly `entries`.
    pub fn set_mac_filter(&mut self, mode: MacFilterMode, entries: Option<&[MacFilterEntry]>) -> OtciResult<()> {
        for entry in entries.unwrap_or_default() {
            hex::validate_hex64(&entry.extaddr)?;
        }

        self.clear_mac_filter()?;
        let Some(entries) = entries else {
            return self.disable_mac_filter();
        };

        self.enable_mac_filter(mode)?;
        for entry in entries {
            self.add_mac_filter_entry(entry)?;
        }
        Ok(())
    }

    pub fn set_allowlist(&mut self, entries: Option<&[MacFilterEntry]>) -> OtciResult<()> {
        self.set_mac_filter(MacFilterMode::Allow, entries)
    }

    pub fn set_denylist(&mut self, entries: Option<&[MacFilterEntry]>) -> OtciResult<()> {
        self.set_mac_filter(MacFilterMode::Deny, entries)
    }
}
