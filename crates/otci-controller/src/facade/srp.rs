//! SRP server and client.

use std::net::Ipv6Addr;
use std::sync::OnceLock;

use otci_protocol::{
    parse_address_list, parse_enabled_or_disabled, parse_int_as, parse_ip6addr_list, parse_ip6addr_str,
    parse_srp_server_hosts, parse_srp_server_services, parse_str, txt_to_hex, CommandLine, KeyValues, OtciError,
    OtciResult, SrpServerHost, SrpServerService, TxtValue,
};
use otci_transport::Transport;
use regex::Regex;

use super::Otci;
use crate::types::{SrpClientHost, SrpClientService};

fn host_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^name:("(.*)"|(\(null\))), state:(\S+), addrs:\[(.*)\]$"#).expect("static regex")
    })
}

fn service_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^instance:"(.*)", name:"(.*)", state:(\S+), port:(\d+), priority:(\d+), weight:(\d+)$"#)
            .expect("static regex")
    })
}

fn server_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\[(.*)\]:(\d+)$").expect("static regex"))
}

/// SRP server LEASE and KEY-LEASE ranges, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrpLeaseConfig {
    pub min_lease: u32,
    pub max_lease: u32,
    pub min_key_lease: u32,
    pub max_key_lease: u32,
}

// ============================================================================
// Decoders
// ============================================================================

/// Decode `srp client host`, e.g.
/// `name:"host1", state:Registered, addrs:[fd00::1]`.
pub fn parse_srp_client_host<S: AsRef<str>>(output: &[S]) -> OtciResult<SrpClientHost> {
    let line = parse_str(output)?;
    let caps = host_pattern()
        .captures(line)
        .ok_or_else(|| OtciError::unexpected(output, "expected an SRP client host line"))?;
    Ok(SrpClientHost {
        name: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        state: caps[4].to_string(),
        addresses: parse_address_list(&format!("[{}]", &caps[5]))?,
    })
}

/// Decode `srp client service`, one service per line.
pub fn parse_srp_client_services<S: AsRef<str>>(output: &[S]) -> OtciResult<Vec<SrpClientService>> {
    output
        .iter()
        .map(|line| {
            let line = line.as_ref();
            let caps = service_pattern()
                .captures(line)
                .ok_or_else(|| OtciError::unexpected(&[line], "expected an SRP client service line"))?;
            let number = |i: usize| {
                caps[i]
                    .parse::<u16>()
                    .map_err(|_| OtciError::unexpected(&[line], "number out of range"))
            };
            Ok(SrpClientService {
                instance: caps[1].to_string(),
                service: caps[2].to_string(),
                state: caps[3].to_string(),
                port: number(4)?,
                priority: number(5)?,
                weight: number(6)?,
            })
        })
        .collect()
}

fn parse_srp_server_lease<S: AsRef<str>>(output: &[S]) -> OtciResult<SrpLeaseConfig> {
    let fields = KeyValues::parse(output)?;
    Ok(SrpLeaseConfig {
        min_lease: fields.int("min lease", 10)?,
        max_lease: fields.int("max lease", 10)?,
        min_key_lease: fields.int("min key-lease", 10)?,
        max_key_lease: fields.int("max key-lease", 10)?,
    })
}

// ============================================================================
// Operations
// ============================================================================

impl<T: Transport> Otci<T> {
    // ------------------------------------------------------------------------
    // Server
    // ------------------------------------------------------------------------

    /// `disabled`, `running` or `stopped`.
    pub fn srp_server_get_state(&mut self) -> OtciResult<String> {
        let output = self.execute("srp server state")?;
        Ok(parse_str(&output)?.to_string())
    }

    pub fn srp_server_enable(&mut self) -> OtciResult<()> {
        self.run("srp server enable")
    }

    pub fn srp_server_disable(&mut self) -> OtciResult<()> {
        self.run("srp server disable")
    }

    pub fn srp_server_get_domain(&mut self) -> OtciResult<String> {
        let output = self.execute("srp server domain")?;
        Ok(parse_str(&output)?.to_string())
    }

    pub fn srp_server_set_domain(&mut self, domain: &str) -> OtciResult<()> {
        self.run(CommandLine::new("srp server domain").text_arg(domain))
    }

    pub fn srp_server_get_lease(&mut self) -> OtciResult<SrpLeaseConfig> {
        let output = self.execute("srp server lease")?;
        parse_srp_server_lease(&output)
    }

    pub fn srp_server_set_lease(&mut self, lease: &SrpLeaseConfig) -> OtciResult<()> {
        if lease.min_lease > lease.max_lease || lease.min_key_lease > lease.max_key_lease {
            return Err(OtciError::InvalidArguments(format!("inverted lease range: {lease:?}")));
        }
        self.run(format!(
            "srp server lease {} {} {} {}",
            lease.min_lease, lease.max_lease, lease.min_key_lease, lease.max_key_lease
        ))
    }

    pub fn srp_server_get_hosts(&mut self) -> OtciResult<Vec<SrpServerHost>> {
        let output = self.execute("srp server host")?;
        parse_srp_server_hosts(&output)
    }

    pub fn srp_server_get_services(&mut self) -> OtciResult<Vec<SrpServerService>> {
        let output = self.execute("srp server service")?;
        parse_srp_server_services(&output)
    }

    // ------------------------------------------------------------------------
    // Client
    // ------------------------------------------------------------------------

    pub fn srp_client_get_state(&mut self) -> OtciResult<bool> {
        let output = self.execute("srp client state")?;
        parse_enabled_or_disabled(&output)
    }

    pub fn srp_client_start(&mut self, server: Ipv6Addr, port: u16) -> OtciResult<()> {
        self.run(format!("srp client start {server} {port}"))
    }

    pub fn srp_client_stop(&mut self) -> OtciResult<()> {
        self.run("srp client stop")
    }

    pub fn srp_client_get_autostart(&mut self) -> OtciResult<bool> {
        let output = self.execute("srp client autostart")?;
        parse_enabled_or_disabled(&output)
    }

    pub fn srp_client_set_autostart(&mut self, enabled: bool) -> OtciResult<()> {
        let word = if enabled { "enable" } else { "disable" };
        self.run(format!("srp client autostart {word}"))
    }

    /// Server the client is talking to.
    pub fn srp_client_get_server(&mut self) -> OtciResult<(Ipv6Addr, u16)> {
        let output = self.execute("srp client server")?;
        let line = parse_str(&output)?;
        let caps = server_pattern()
            .captures(line)
            .ok_or_else(|| OtciError::unexpected(&output, "expected `[addr]:port`"))?;
        let port = caps[2]
            .parse::<u16>()
            .map_err(|_| OtciError::unexpected(&output, "port out of range"))?;
        Ok((parse_ip6addr_str(&caps[1])?, port))
    }

    pub fn srp_client_get_host(&mut self) -> OtciResult<SrpClientHost> {
        let output = self.execute("srp client host")?;
        parse_srp_client_host(&output)
    }

    /// Host name, empty when unset.
    pub fn srp_client_get_host_name(&mut self) -> OtciResult<String> {
        let output = self.execute("srp client host name")?;
        let name = parse_str(&output)?;
        Ok(if name == "(null)" { String::new() } else { name.to_string() })
    }

    pub fn srp_client_set_host_name(&mut self, name: &str) -> OtciResult<()> {
        self.run(CommandLine::new("srp client host name").text_arg(name))
    }

    pub fn srp_client_get_host_addresses(&mut self) -> OtciResult<Vec<Ipv6Addr>> {
        let output = self.execute("srp client host address")?;
        parse_ip6addr_list(&output)
    }

    pub fn srp_client_set_host_addresses(&mut self, addrs: &[Ipv6Addr]) -> OtciResult<()> {
        if addrs.is_empty() {
            return Err(OtciError::InvalidArguments("at least one host address is required".to_string()));
        }
        let line = addrs
            .iter()
            .fold(CommandLine::new("srp client host address"), |line, addr| line.arg(addr));
        self.run(line)
    }

    pub fn srp_client_get_host_state(&mut self) -> OtciResult<String> {
        let output = self.execute("srp client host state")?;
        Ok(parse_str(&output)?.to_string())
    }

    /// Unregister the host; with `remove_key_lease` the name is released too.
    pub fn srp_client_remove_host(&mut self, remove_key_lease: bool) -> OtciResult<()> {
        self.run(CommandLine::new("srp client host remove").flag(remove_key_lease, "1"))
    }

    /// Forget the host without telling the server.
    pub fn srp_client_clear_host(&mut self) -> OtciResult<()> {
        self.run("srp client host clear")
    }

    pub fn srp_client_get_services(&mut self) -> OtciResult<Vec<SrpClientService>> {
        let output = self.execute("srp client service")?;
        parse_srp_client_services(&output)
    }

    /// Register a service. The instance name is free text and escaped.
    pub fn srp_client_add_service(
        &mut self,
        instance: &str,
        service: &str,
        port: u16,
        priority: u16,
        weight: u16,
        txt: &[(String, TxtValue)],
    ) -> OtciResult<()> {
        let txt = if txt.is_empty() { None } else { Some(txt_to_hex(txt)?) };
        self.run(
            CommandLine::new("srp client service add")
                .text_arg(instance)
                .arg(service)
                .arg(port)
                .arg(priority)
                .arg(weight)
                .opt_arg(txt),
        )
    }

    pub fn srp_client_remove_service(&mut self, instance: &str, service: &str) -> OtciResult<()> {
        self.run(
            CommandLine::new("srp client service remove")
                .text_arg(instance)
                .arg(service),
        )
    }

    pub fn srp_client_clear_service(&mut self, instance: &str, service: &str) -> OtciResult<()> {
        self.run(
            CommandLine::new("srp client service clear")
                .text_arg(instance)
                .arg(service),
        )
    }

    pub fn srp_client_get_lease_interval(&mut self) -> OtciResult<u32> {
        let output = self.execute("srp client leaseinterval")?;
        parse_int_as(&output, 10)
    }

    pub fn srp_client_set_lease_interval(&mut self, seconds: u32) -> OtciResult<()> {
        self.run(format!("srp client leaseinterval {seconds}"))
    }

    pub fn srp_client_get_key_lease_interval(&mut self) -> OtciResult<u32> {
        let output = self.execute("srp client keyleaseinterval")?;
        parse_int_as(&output, 10)
    }

    pub fn srp_client_set_key_lease_interval(&mut self, seconds: u32) -> OtciResult<()> {
        self.run(format!("srp client keyleaseinterval {seconds}"))
    }
}
