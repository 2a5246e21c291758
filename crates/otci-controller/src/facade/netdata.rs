//! Thread network data: on-mesh prefixes, external routes and services.

use otci_protocol::{hex, parse_field, parse_hex_bytes, parse_prefix, Ip6Prefix, OtciError, OtciResult};
use otci_transport::Transport;

use super::Otci;
use crate::capability::Capability;
use crate::types::{parse_as, ExternalRoute, NetDataService, NetworkData, OnMeshPrefix};

const PREFERENCES: [&str; 3] = ["high", "med", "low"];

fn check_preference(preference: &str) -> OtciResult<()> {
    if PREFERENCES.contains(&preference) {
        Ok(())
    } else {
        Err(OtciError::InvalidArguments(format!("invalid preference `{preference}`")))
    }
}

fn check_hex(data: &str) -> OtciResult<()> {
    if hex::is_valid(data) {
        Ok(())
    } else {
        Err(OtciError::InvalidArguments(format!("expected hex data, got `{data}`")))
    }
}

// ============================================================================
// Decoders
// ============================================================================

/// Decode one prefix line: `[- ]<prefix> <flags> <prf> <rloc16> ...`.
pub fn parse_prefix_line(line: &str) -> OtciResult<OnMeshPrefix> {
    let body = line.strip_prefix("- ").unwrap_or(line);
    match body.split_whitespace().collect::<Vec<_>>()[..] {
        [prefix, flags, preference, rloc16, ..] => Ok(OnMeshPrefix {
            prefix: parse_as(prefix, "an IPv6 prefix")?,
            flags: flags.to_string(),
            preference: preference.to_string(),
            rloc16: rloc16.parse()?,
        }),
        _ => Err(OtciError::unexpected(&[line], "expected `<prefix> <flags> <prf> <rloc16>`")),
    }
}

/// Decode one route line: `<prefix> <flags> <prf> <rloc16>` or, with no
/// flags, `<prefix> <prf> <rloc16>`.
pub fn parse_route_line(line: &str) -> OtciResult<ExternalRoute> {
    let (prefix, stable, preference, rloc16) = match line.split_whitespace().collect::<Vec<_>>()[..] {
        [prefix, flags, preference, rloc16] => (prefix, flags.contains('s'), preference, rloc16),
        [prefix, preference, rloc16] => (prefix, false, preference, rloc16),
        _ => return Err(OtciError::unexpected(&[line], "expected 3 or 4 route fields")),
    };
    Ok(ExternalRoute {
        prefix: parse_as(prefix, "an IPv6 prefix")?,
        stable,
        preference: preference.to_string(),
        rloc16: rloc16.parse()?,
    })
}

/// Decode one service line: `<enterprise> <service data> <server data> [s] <rloc16>`.
pub fn parse_service_line(line: &str) -> OtciResult<NetDataService> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let (head, stable, rloc16) = match words[..] {
        [e, svc, srv, "s", rloc16] => ([e, svc, srv], true, rloc16),
        [e, svc, srv, rloc16] => ([e, svc, srv], false, rloc16),
        _ => return Err(OtciError::unexpected(&[line], "expected 4 or 5 service fields")),
    };
    let [enterprise, service_data, server_data] = head;
    Ok(NetDataService {
        enterprise_number: parse_field(enterprise, 10)?,
        service_data: hex::decode(service_data)?,
        server_data: hex::decode(server_data)?,
        stable,
        rloc16: rloc16.parse()?,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Prefixes,
    Routes,
    Services,
    Contexts,
    Other,
}

/// Decode `netdata show`.
///
/// The reply must open with `Prefixes:`. Sections after `Contexts:` (such
/// as commissioning data) are skipped.
pub fn parse_netdata<S: AsRef<str>>(output: &[S]) -> OtciResult<NetworkData> {
    let mut lines = output.iter().map(AsRef::as_ref);
    if lines.next() != Some("Prefixes:") {
        return Err(OtciError::unexpected(output, "expected `Prefixes:` first"));
    }

    let mut netdata = NetworkData::default();
    let mut section = Section::Prefixes;

    for line in lines {
        let next = match line {
            "Routes:" => Some(Section::Routes),
            "Services:" => Some(Section::Services),
            "Contexts:" => Some(Section::Contexts),
            _ if section == Section::Contexts && line.ends_with(':') && !line.contains(' ') => Some(Section::Other),
            _ => None,
        };
        if let Some(next) = next {
            section = next;
            continue;
        }

        match section {
            Section::Prefixes => netdata.prefixes.push(parse_prefix_line(line)?),
            Section::Routes => netdata.routes.push(parse_route_line(line)?),
            Section::Services => netdata.services.push(parse_service_line(line)?),
            Section::Contexts => netdata.contexts.push(line.to_string()),
            Section::Other => {}
        }
    }

    Ok(netdata)
}

// ============================================================================
// Operations
// ============================================================================

impl<T: Transport> Otci<T> {
    pub fn get_network_data(&mut self) -> OtciResult<NetworkData> {
        let output = self.execute("netdata show")?;
        parse_netdata(&output)
    }

    pub fn get_prefixes(&mut self) -> OtciResult<Vec<OnMeshPrefix>> {
        Ok(self.get_network_data()?.prefixes)
    }

    pub fn get_routes(&mut self) -> OtciResult<Vec<ExternalRoute>> {
        Ok(self.get_network_data()?.routes)
    }

    pub fn get_services(&mut self) -> OtciResult<Vec<NetDataService>> {
        Ok(self.get_network_data()?.services)
    }

    /// Raw network data TLVs.
    pub fn get_network_data_bytes(&mut self) -> OtciResult<Vec<u8>> {
        let flag = self.keyword(Capability::BinaryFlag)?;
        let output = self.execute(format!("netdata show {flag}"))?;
        parse_hex_bytes(&output)
    }

    /// Push local network data to the leader.
    pub fn register_network_data(&mut self) -> OtciResult<()> {
        self.run("netdata register")
    }

    pub fn get_mesh_local_prefix(&mut self) -> OtciResult<Ip6Prefix> {
        let output = self.execute("prefix meshlocal")?;
        parse_prefix(&output)
    }

    pub fn set_mesh_local_prefix(&mut self, prefix: &Ip6Prefix) -> OtciResult<()> {
        self.run(format!("prefix meshlocal {prefix}"))
    }

    /// Prefixes in the local network data.
    pub fn get_local_prefixes(&mut self) -> OtciResult<Vec<OnMeshPrefix>> {
        self.execute("prefix")?.iter().map(|line| parse_prefix_line(line)).collect()
    }

    pub fn add_prefix(&mut self, prefix: &Ip6Prefix, flags: &str, preference: &str) -> OtciResult<()> {
        check_preference(preference)?;
        self.run(format!("prefix add {prefix} {flags} {preference}"))
    }

    pub fn remove_prefix(&mut self, prefix: &Ip6Prefix) -> OtciResult<()> {
        self.run(format!("prefix remove {prefix}"))
    }

    /// External routes in the local network data.
    pub fn get_local_routes(&mut self) -> OtciResult<Vec<ExternalRoute>> {
        self.execute("route")?.iter().map(|line| parse_route_line(line)).collect()
    }

    pub fn add_route(&mut self, prefix: &Ip6Prefix, stable: bool, preference: &str) -> OtciResult<()> {
        check_preference(preference)?;
        let stable = if stable { " s" } else { "" };
        self.run(format!("route add {prefix}{stable} {preference}"))
    }

    pub fn remove_route(&mut self, prefix: &Ip6Prefix) -> OtciResult<()> {
        self.run(format!("route remove {prefix}"))
    }

    /// Add a service; data arguments are hex.
    pub fn add_service(&mut self, enterprise_number: u32, service_data: &str, server_data: &str) -> OtciResult<()> {
        check_hex(service_data)?;
        check_hex(server_data)?;
        self.run(format!("service add {enterprise_number} {service_data} {server_data}"))
    }

    pub fn remove_service(&mut self, enterprise_number: u32, service_data: &str) -> OtciResult<()> {
        check_hex(service_data)?;
        self.run(format!("service remove {enterprise_number} {service_data}"))
    }
}
