//! Device basics: identity, role, radio and network parameters.

use otci_protocol::{
    escape_escapable, hex, parse_enabled_or_disabled, parse_hex64, parse_int_as, parse_int_list, parse_network_key,
    parse_str, parse_values, CommandLine, OtciError, OtciResult,
};
use otci_transport::Transport;

use super::Otci;
use crate::capability::Capability;
use crate::types::{parse_as, DeviceMode, PartitionId, Rloc16, RouterId, ThreadState};

/// Decode a `<n> dBm` reply.
fn parse_dbm<S: AsRef<str>>(output: &[S]) -> OtciResult<i8> {
    let line = parse_str(output)?;
    let value = line
        .strip_suffix(" dBm")
        .ok_or_else(|| OtciError::unexpected(output, "expected `<n> dBm`"))?;
    otci_protocol::parse_field(value, 10)
}

impl<T: Transport> Otci<T> {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Reboot the device. Output printed while it restarts is returned as is.
    pub fn reset(&mut self) -> OtciResult<Vec<String>> {
        self.execute("reset")
    }

    /// Erase persistent settings and reboot.
    pub fn factory_reset(&mut self) -> OtciResult<Vec<String>> {
        let output = self.execute("factoryreset")?;
        self.reset_capabilities();
        Ok(output)
    }

    pub fn ifconfig_up(&mut self) -> OtciResult<()> {
        self.run("ifconfig up")
    }

    pub fn ifconfig_down(&mut self) -> OtciResult<()> {
        self.run("ifconfig down")
    }

    /// Whether the IPv6 interface is up.
    pub fn get_ifconfig_state(&mut self) -> OtciResult<bool> {
        let output = self.execute("ifconfig")?;
        parse_values(&output, &[("up", true), ("down", false)])
    }

    pub fn thread_start(&mut self) -> OtciResult<()> {
        self.run("thread start")
    }

    pub fn thread_stop(&mut self) -> OtciResult<()> {
        self.run("thread stop")
    }

    pub fn get_state(&mut self) -> OtciResult<ThreadState> {
        let output = self.execute("state")?;
        parse_str(&output)?.parse()
    }

    /// Force a role (`child`, `router`, `leader` or `detached`).
    pub fn set_state(&mut self, state: ThreadState) -> OtciResult<()> {
        if state == ThreadState::Disabled {
            return Err(OtciError::InvalidArguments("the disabled state cannot be forced".to_string()));
        }
        self.run(format!("state {state}"))
    }

    // ========================================================================
    // Mode and radio
    // ========================================================================

    pub fn get_mode(&mut self) -> OtciResult<DeviceMode> {
        let output = self.execute("mode")?;
        parse_as(parse_str(&output)?, "a device mode")
    }

    pub fn set_mode(&mut self, mode: DeviceMode) -> OtciResult<()> {
        self.run(format!("mode {mode}"))
    }

    pub fn get_channel(&mut self) -> OtciResult<u16> {
        let output = self.execute("channel")?;
        parse_int_as(&output, 10)
    }

    pub fn set_channel(&mut self, channel: u16) -> OtciResult<()> {
        self.run(format!("channel {channel}"))
    }

    pub fn get_txpower(&mut self) -> OtciResult<i8> {
        let output = self.execute("txpower")?;
        parse_dbm(&output)
    }

    pub fn set_txpower(&mut self, dbm: i8) -> OtciResult<()> {
        self.run(format!("txpower {dbm}"))
    }

    pub fn get_cca_threshold(&mut self) -> OtciResult<i8> {
        let output = self.execute("ccathreshold")?;
        parse_dbm(&output)
    }

    pub fn set_cca_threshold(&mut self, dbm: i8) -> OtciResult<()> {
        self.run(format!("ccathreshold {dbm}"))
    }

    // ========================================================================
    // Identity
    // ========================================================================

    pub fn get_panid(&mut self) -> OtciResult<u16> {
        let output = self.execute("panid")?;
        parse_int_as(&output, 16)
    }

    pub fn set_panid(&mut self, panid: u16) -> OtciResult<()> {
        self.run(format!("panid {panid:#06x}"))
    }

    pub fn get_extaddr(&mut self) -> OtciResult<String> {
        let output = self.execute("extaddr")?;
        parse_hex64(&output)
    }

    pub fn set_extaddr(&mut self, extaddr: &str) -> OtciResult<()> {
        hex::validate_hex64(extaddr)?;
        self.run(format!("extaddr {extaddr}"))
    }

    pub fn get_eui64(&mut self) -> OtciResult<String> {
        let output = self.execute("eui64")?;
        parse_hex64(&output)
    }

    pub fn get_extpanid(&mut self) -> OtciResult<String> {
        let output = self.execute("extpanid")?;
        parse_hex64(&output)
    }

    pub fn set_extpanid(&mut self, extpanid: &str) -> OtciResult<()> {
        hex::validate_hex64(extpanid)?;
        self.run(format!("extpanid {extpanid}"))
    }

    pub fn get_network_name(&mut self) -> OtciResult<String> {
        let output = self.execute("networkname")?;
        Ok(parse_str(&output)?.to_string())
    }

    pub fn set_network_name(&mut self, name: &str) -> OtciResult<()> {
        self.run(format!("networkname {}", escape_escapable(name)))
    }

    /// Network key, as 32 hex digits.
    pub fn get_network_key(&mut self) -> OtciResult<String> {
        let keyword = self.keyword(Capability::NetworkKey)?;
        let output = self.execute(keyword)?;
        parse_network_key(&output)
    }

    pub fn set_network_key(&mut self, key: &str) -> OtciResult<()> {
        hex::validate_key128(key)?;
        let keyword = self.keyword(Capability::NetworkKey)?;
        self.run(CommandLine::new(keyword).arg(key))
    }

    // ========================================================================
    // Addressing and partition
    // ========================================================================

    pub fn get_rloc16(&mut self) -> OtciResult<Rloc16> {
        let output = self.execute("rloc16")?;
        parse_int_as(&output, 16).map(Rloc16)
    }

    /// Router id derived from the RLOC16.
    pub fn get_router_id(&mut self) -> OtciResult<RouterId> {
        Ok(self.get_rloc16()?.router_id())
    }

    pub fn get_leader_weight(&mut self) -> OtciResult<u8> {
        let output = self.execute("leaderweight")?;
        parse_int_as(&output, 10)
    }

    pub fn set_leader_weight(&mut self, weight: u8) -> OtciResult<()> {
        self.run(format!("leaderweight {weight}"))
    }

    pub fn get_partition_id(&mut self) -> OtciResult<PartitionId> {
        let output = self.execute("partitionid")?;
        parse_int_as(&output, 10).map(PartitionId)
    }

    pub fn get_preferred_partition_id(&mut self) -> OtciResult<PartitionId> {
        let keyword = self.keyword(Capability::PreferredPartitionId)?;
        let output = self.execute(keyword)?;
        parse_int_as(&output, 10).map(PartitionId)
    }

    pub fn set_preferred_partition_id(&mut self, id: PartitionId) -> OtciResult<()> {
        let keyword = self.keyword(Capability::PreferredPartitionId)?;
        self.run(CommandLine::new(keyword).arg(id))
    }

    pub fn get_router_eligible(&mut self) -> OtciResult<bool> {
        let output = self.execute("routereligible")?;
        parse_enabled_or_disabled(&output)
    }

    pub fn set_router_eligible(&mut self, eligible: bool) -> OtciResult<()> {
        let word = if eligible { "enable" } else { "disable" };
        self.run(format!("routereligible {word}"))
    }

    // ========================================================================
    // Unsecure ports
    // ========================================================================

    /// Ports allowed to receive unsecured frames.
    pub fn get_unsecure_ports(&mut self) -> OtciResult<Vec<u16>> {
        let output = self.execute("unsecureport get")?;
        if output.is_empty() {
            return Ok(Vec::new());
        }
        parse_int_list(&output)?
            .into_iter()
            .map(|port| u16::try_from(port).map_err(|_| OtciError::unexpected(&output, "port out of range")))
            .collect()
    }

    pub fn add_unsecure_port(&mut self, port: u16) -> OtciResult<()> {
        self.run(format!("unsecureport add {port}"))
    }

    pub fn remove_unsecure_port(&mut self, port: u16) -> OtciResult<()> {
        self.run(format!("unsecureport remove {port}"))
    }

    pub fn clear_unsecure_ports(&mut self) -> OtciResult<()> {
        self.run("unsecureport remove all")
    }
}
