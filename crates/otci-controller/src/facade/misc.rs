//! Counters, EID cache, CSL, commissioner and joiner.

use std::collections::BTreeMap;

use otci_protocol::{
    hex, parse_field, parse_hex64, parse_int_as, parse_ip6addr_str, parse_str, CommandLine, KeyValues, OtciError,
    OtciResult,
};
use otci_transport::Transport;
use tracing::warn;

use super::Otci;
use crate::types::{CslConfig, EidCacheEntry};

// ============================================================================
// Decoders
// ============================================================================

/// Decode `counters <name>`. Nested counters keep their own names.
pub fn parse_counters<S: AsRef<str>>(output: &[S]) -> OtciResult<BTreeMap<String, u64>> {
    KeyValues::parse(output)?
        .iter()
        .map(|(key, value)| Ok((key.to_string(), parse_field(value, 10)?)))
        .collect()
}

/// Decode `eidcache`: `<eid> <rloc16> <state and timers>` per line.
pub fn parse_eidcache<S: AsRef<str>>(output: &[S]) -> OtciResult<Vec<EidCacheEntry>> {
    output
        .iter()
        .map(|line| {
            let line = line.as_ref();
            let mut parts = line.splitn(3, ' ');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(eid), Some(rloc16), details) => Ok(EidCacheEntry {
                    eid: parse_ip6addr_str(eid)?,
                    rloc16: rloc16.parse()?,
                    details: details.unwrap_or_default().to_string(),
                }),
                _ => Err(OtciError::unexpected(&[line], "expected `<eid> <rloc16> ...`")),
            }
        })
        .collect()
}

/// Strip a unit suffix and parse the number in front of it.
fn with_unit(value: &str, unit: &str) -> OtciResult<u32> {
    let number = value
        .strip_suffix(unit)
        .ok_or_else(|| OtciError::unexpected(&[value], format!("expected a value in `{unit}`")))?;
    parse_field(number, 10)
}

/// Decode `csl`. Unknown parameters are logged and skipped.
pub fn parse_csl_config<S: AsRef<str>>(output: &[S]) -> OtciResult<CslConfig> {
    let mut config = CslConfig::default();
    for (key, value) in KeyValues::parse(output)?.iter() {
        match key {
            "channel" | "Channel" => config.channel = Some(parse_field(value, 10)?),
            "period" | "Period" => config.period_us = Some(with_unit(value, "us")?),
            "timeout" | "Timeout" => config.timeout_s = Some(with_unit(value, "s")?),
            _ => warn!("ignoring unknown CSL parameter {}: {}", key, value),
        }
    }
    Ok(config)
}

/// Exactly one of `eui64` and `discerner` must be given; an EUI-64 other
/// than `*` must be 16 hex digits.
fn joiner_target<'a>(eui64: Option<&'a str>, discerner: Option<&'a str>) -> OtciResult<&'a str> {
    match (eui64, discerner) {
        (Some(eui64), None) => {
            if eui64 != "*" {
                hex::validate_hex64(eui64)?;
            }
            Ok(eui64)
        }
        (None, Some(discerner)) => Ok(discerner),
        _ => Err(OtciError::InvalidArguments(
            "specify either an EUI-64 or a discerner, not both".to_string(),
        )),
    }
}

// ============================================================================
// Operations
// ============================================================================

impl<T: Transport> Otci<T> {
    /// Names of the counter groups the firmware supports.
    pub fn get_counter_names(&mut self) -> OtciResult<Vec<String>> {
        self.execute("counters")
    }

    pub fn get_counter(&mut self, name: &str) -> OtciResult<BTreeMap<String, u64>> {
        let output = self.execute(format!("counters {name}"))?;
        parse_counters(&output)
    }

    pub fn reset_counter(&mut self, name: &str) -> OtciResult<()> {
        self.run(format!("counters {name} reset"))
    }

    pub fn get_eidcache(&mut self) -> OtciResult<Vec<EidCacheEntry>> {
        let output = self.execute("eidcache")?;
        parse_eidcache(&output)
    }

    // ========================================================================
    // CSL
    // ========================================================================

    pub fn get_csl_config(&mut self) -> OtciResult<CslConfig> {
        let output = self.execute("csl")?;
        parse_csl_config(&output)
    }

    /// Set the given CSL parameters. A period of 0 disables CSL.
    pub fn config_csl(&mut self, config: &CslConfig) -> OtciResult<()> {
        if *config == CslConfig::default() {
            return Err(OtciError::InvalidArguments("no CSL parameter given".to_string()));
        }
        if let Some(channel) = config.channel {
            self.run(format!("csl channel {channel}"))?;
        }
        if let Some(period) = config.period_us {
            self.run(format!("csl period {period}"))?;
        }
        if let Some(timeout) = config.timeout_s {
            self.run(format!("csl timeout {timeout}"))?;
        }
        Ok(())
    }

    // ========================================================================
    // Commissioner
    // ========================================================================

    pub fn commissioner_start(&mut self) -> OtciResult<()> {
        self.run("commissioner start")
    }

    pub fn commissioner_stop(&mut self) -> OtciResult<()> {
        self.run("commissioner stop")
    }

    /// `disabled`, `petition` or `active`.
    pub fn get_commissioner_state(&mut self) -> OtciResult<String> {
        let output = self.execute("commissioner state")?;
        Ok(parse_str(&output)?.to_string())
    }

    pub fn get_commissioner_session_id(&mut self) -> OtciResult<u16> {
        let output = self.execute("commissioner sessionid")?;
        parse_int_as(&output, 10)
    }

    /// Allow a joiner identified by EUI-64 (`*` for any) or by discerner.
    pub fn commissioner_add_joiner(
        &mut self,
        pskd: &str,
        eui64: Option<&str>,
        discerner: Option<&str>,
        timeout: Option<u32>,
    ) -> OtciResult<()> {
        let target = joiner_target(eui64, discerner)?;
        self.run(
            CommandLine::new("commissioner joiner add")
                .arg(target)
                .text_arg(pskd)
                .opt_arg(timeout),
        )
    }

    pub fn commissioner_remove_joiner(&mut self, eui64: Option<&str>, discerner: Option<&str>) -> OtciResult<()> {
        let target = joiner_target(eui64, discerner)?;
        self.run(format!("commissioner joiner remove {target}"))
    }

    pub fn set_commissioner_provisioning_url(&mut self, url: &str) -> OtciResult<()> {
        self.run(CommandLine::new("commissioner provisioningurl").text_arg(url))
    }

    // ========================================================================
    // Joiner
    // ========================================================================

    pub fn joiner_start(&mut self, pskd: &str, provisioning_url: Option<&str>) -> OtciResult<()> {
        self.run(CommandLine::new("joiner start").text_arg(pskd).opt_text_arg(provisioning_url))
    }

    pub fn joiner_stop(&mut self) -> OtciResult<()> {
        self.run("joiner stop")
    }

    pub fn get_joiner_id(&mut self) -> OtciResult<String> {
        let output = self.execute("joiner id")?;
        parse_hex64(&output)
    }

    pub fn get_joiner_port(&mut self) -> OtciResult<u16> {
        let output = self.execute("joinerport")?;
        parse_int_as(&output, 10)
    }

    pub fn set_joiner_port(&mut self, port: u16) -> OtciResult<()> {
        self.run(format!("joinerport {port}"))
    }
}
