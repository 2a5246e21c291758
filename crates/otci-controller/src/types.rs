//! Typed values decoded from device output.

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use otci_protocol::{parse_int_str, Ip6Prefix, OtciError, OtciResult};

// ============================================================================
// Identifiers
// ============================================================================

/// A 16-bit routing locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rloc16(pub u16);

impl Rloc16 {
    /// Router id encoded in the upper six bits.
    pub fn router_id(self) -> RouterId {
        RouterId((self.0 >> 10) as u8)
    }

    /// Child id encoded in the lower nine bits (zero for the router itself).
    pub fn child_id(self) -> ChildId {
        ChildId(self.0 & 0x1ff)
    }

    pub fn is_router(self) -> bool {
        self.child_id().0 == 0
    }
}

impl fmt::Display for Rloc16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

impl FromStr for Rloc16 {
    type Err = OtciError;

    /// Parse hex with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_int_str(s, 16)
            .and_then(|v| u16::try_from(v).ok())
            .map(Rloc16)
            .ok_or_else(|| OtciError::unexpected(&[s], "expected an RLOC16"))
    }
}

/// A router id (0..=62).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouterId(pub u8);

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A child id (1..=511).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChildId(pub u16);

impl fmt::Display for ChildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Thread partition id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(pub u32);

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// State and mode
// ============================================================================

/// Thread device role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadState {
    Disabled,
    Detached,
    Child,
    Router,
    Leader,
}

impl ThreadState {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreadState::Disabled => "disabled",
            ThreadState::Detached => "detached",
            ThreadState::Child => "child",
            ThreadState::Router => "router",
            ThreadState::Leader => "leader",
        }
    }

    /// Attached as a router or leader.
    pub fn is_router_role(self) -> bool {
        matches!(self, ThreadState::Router | ThreadState::Leader)
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreadState {
    type Err = OtciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(ThreadState::Disabled),
            "detached" => Ok(ThreadState::Detached),
            "child" => Ok(ThreadState::Child),
            "router" => Ok(ThreadState::Router),
            "leader" => Ok(ThreadState::Leader),
            _ => Err(OtciError::unexpected(&[s], "unknown thread state")),
        }
    }
}

/// Thread device mode flags.
///
/// Printed as any combination of `r` (rx-on-when-idle), `d` (full Thread
/// device) and `n` (full network data), or `-` when none is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DeviceMode {
    pub rx_on_when_idle: bool,
    pub full_thread_device: bool,
    pub full_network_data: bool,
}

impl DeviceMode {
    pub fn from_flags(r: bool, d: bool, n: bool) -> Self {
        DeviceMode {
            rx_on_when_idle: r,
            full_thread_device: d,
            full_network_data: n,
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == DeviceMode::default() {
            return f.write_str("-");
        }
        if self.rx_on_when_idle {
            f.write_str("r")?;
        }
        if self.full_thread_device {
            f.write_str("d")?;
        }
        if self.full_network_data {
            f.write_str("n")?;
        }
        Ok(())
    }
}

impl FromStr for DeviceMode {
    type Err = OtciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || OtciError::InvalidArguments(format!("invalid device mode `{s}`"));
        if s == "-" {
            return Ok(DeviceMode::default());
        }
        if s.is_empty() {
            return Err(err());
        }

        let mut mode = DeviceMode::default();
        for c in s.chars() {
            let flag = match c {
                'r' => &mut mode.rx_on_when_idle,
                'd' => &mut mode.full_thread_device,
                'n' => &mut mode.full_network_data,
                _ => return Err(err()),
            };
            if *flag {
                return Err(err());
            }
            *flag = true;
        }
        Ok(mode)
    }
}

/// Security policy from an operational dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    /// Key rotation time in hours.
    pub rotation_time: u32,
    /// Policy flag letters, e.g. `onrc`.
    pub flags: String,
}

// ============================================================================
// Tables
// ============================================================================

/// One row of `router table`, or the result of `router <id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterTableEntry {
    pub id: RouterId,
    pub rloc16: Rloc16,
    pub next_hop: u8,
    pub path_cost: u8,
    pub lq_in: u8,
    pub lq_out: u8,
    pub age: u32,
    pub extaddr: String,
    /// Whether a link to this router is established.
    pub link: bool,
}

/// Result of `router <id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterInfo {
    pub id: RouterId,
    pub rloc16: Rloc16,
    pub alloc: bool,
    /// Next hop, as a router id.
    pub next_hop: RouterId,
    pub link: bool,
}

/// One row of `child table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildTableEntry {
    pub id: ChildId,
    pub rloc16: Rloc16,
    pub timeout: u32,
    pub age: u32,
    pub lq_in: u8,
    pub c_vn: u8,
    pub mode: DeviceMode,
    pub extaddr: String,
    /// Thread version, when the firmware prints it.
    pub ver: Option<u8>,
    /// CSL synchronized, when the firmware prints it.
    pub csl: Option<bool>,
    /// Queued message count, when the firmware prints it.
    pub qmsgcnt: Option<u16>,
    /// Supervision interval, when the firmware prints it.
    pub suprvsn: Option<u16>,
}

/// Result of `child <id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildInfo {
    pub id: Option<ChildId>,
    pub rloc16: Option<Rloc16>,
    pub extaddr: Option<String>,
    pub mode: Option<DeviceMode>,
    pub c_vn: Option<u8>,
    pub timeout: Option<u32>,
    pub age: Option<u32>,
    pub lq_in: Option<u8>,
    pub rssi: Option<i8>,
}

/// One row of `neighbor table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborTableEntry {
    pub is_router: bool,
    pub rloc16: Rloc16,
    pub age: u32,
    pub avg_rssi: i8,
    pub last_rssi: i8,
    pub mode: DeviceMode,
    pub extaddr: String,
}

/// Decoded `leaderdata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderData {
    pub partition_id: PartitionId,
    pub weighting: u8,
    pub data_version: u8,
    pub stable_data_version: u8,
    pub leader_router_id: RouterId,
}

// ============================================================================
// Dataset
// ============================================================================

/// Decoded operational dataset. Fields the device did not print are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub active_timestamp: Option<u64>,
    pub pending_timestamp: Option<u64>,
    pub delay: Option<u32>,
    pub channel: Option<u16>,
    pub wakeup_channel: Option<u16>,
    pub channel_mask: Option<u32>,
    pub extpanid: Option<String>,
    pub mesh_local_prefix: Option<Ip6Prefix>,
    pub network_key: Option<String>,
    pub network_name: Option<String>,
    pub panid: Option<u16>,
    pub pskc: Option<String>,
    pub security_policy: Option<SecurityPolicy>,
}

/// Which stored dataset a command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Active,
    Pending,
}

impl DatasetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Active => "active",
            DatasetKind::Pending => "pending",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields to write into the dataset buffer; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetParams {
    pub active_timestamp: Option<u64>,
    pub channel: Option<u16>,
    pub wakeup_channel: Option<u16>,
    pub channel_mask: Option<u32>,
    pub extpanid: Option<String>,
    pub mesh_local_prefix: Option<Ip6Prefix>,
    pub network_key: Option<String>,
    pub network_name: Option<String>,
    pub panid: Option<u16>,
    pub pskc: Option<String>,
    pub security_policy: Option<SecurityPolicy>,
    pub pending_timestamp: Option<u64>,
    /// Delay timer in milliseconds (pending datasets only).
    pub delay: Option<u32>,
}

// ============================================================================
// Network data
// ============================================================================

/// An on-mesh prefix entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnMeshPrefix {
    pub prefix: Ip6Prefix,
    /// Flag letters such as `paros`.
    pub flags: String,
    /// `high`, `med` or `low`.
    pub preference: String,
    pub rloc16: Rloc16,
}

/// An external route entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRoute {
    pub prefix: Ip6Prefix,
    pub stable: bool,
    pub preference: String,
    pub rloc16: Rloc16,
}

/// A service entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetDataService {
    pub enterprise_number: u32,
    pub service_data: Vec<u8>,
    pub server_data: Vec<u8>,
    pub stable: bool,
    pub rloc16: Rloc16,
}

/// Decoded `netdata show`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkData {
    pub prefixes: Vec<OnMeshPrefix>,
    pub routes: Vec<ExternalRoute>,
    pub services: Vec<NetDataService>,
    /// Raw lines of the `Contexts:` section, if printed.
    pub contexts: Vec<String>,
}

// ============================================================================
// SRP client
// ============================================================================

/// Decoded `srp client host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrpClientHost {
    /// Host name, empty when unset.
    pub name: String,
    pub state: String,
    pub addresses: Vec<Ipv6Addr>,
}

/// One line of `srp client service`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrpClientService {
    pub instance: String,
    pub service: String,
    pub state: String,
    pub port: u16,
    pub priority: u16,
    pub weight: u16,
}

// ============================================================================
// Misc
// ============================================================================

/// Decoded `csl`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CslConfig {
    pub channel: Option<u16>,
    /// Period in microseconds.
    pub period_us: Option<u32>,
    /// Timeout in seconds.
    pub timeout_s: Option<u32>,
}

/// One `eidcache` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EidCacheEntry {
    pub eid: Ipv6Addr,
    pub rloc16: Rloc16,
    /// Remainder of the line (cache state and timers).
    pub details: String,
}

/// Parse a cell with `FromStr`, mapping errors to unexpected output.
pub(crate) fn parse_as<T: FromStr>(value: &str, what: &str) -> OtciResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| OtciError::unexpected(&[value], format!("expected {what}")))
}
