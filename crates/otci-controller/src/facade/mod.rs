//! Typed device facade.
//!
//! [`Otci`] wraps an [`Executor`] with one method per device operation. Each
//! method validates its arguments before any I/O, builds the command line,
//! executes it and decodes the payload. Operations whose keyword changed
//! across firmware revisions go through the per-connection
//! [`CapabilityCache`].

use std::time::Duration;

use otci_protocol::{parse_int, parse_str, LinePattern, OtciError, OtciResult};
use otci_transport::Transport;
use tracing::debug;

use crate::capability::{Capability, CapabilityCache};
use crate::config::{CommandInvocation, ExecutorConfig};
use crate::executor::{Executor, ExecutorStats};

mod dataset;
mod device;
mod ipaddr;
mod macfilter;
mod misc;
mod netdata;
mod srp;
mod tables;

pub use dataset::parse_dataset;
pub use macfilter::{MacFilterEntry, MacFilterMode};
pub use misc::{parse_counters, parse_csl_config, parse_eidcache};
pub use netdata::{parse_netdata, parse_prefix_line, parse_route_line, parse_service_line};
pub use srp::{parse_srp_client_host, parse_srp_client_services, SrpLeaseConfig};
pub use tables::{parse_child_info, parse_child_table, parse_leader_data, parse_neighbor_table, parse_router_info};

/// Controller for one device console.
pub struct Otci<T: Transport> {
    executor: Executor<T>,
    caps: CapabilityCache,
}

impl<T: Transport> Otci<T> {
    pub fn new(transport: T) -> Self {
        Self::from_executor(Executor::new(transport))
    }

    pub fn with_config(transport: T, config: ExecutorConfig) -> Self {
        Self::from_executor(Executor::with_config(transport, config))
    }

    pub fn from_executor(executor: Executor<T>) -> Self {
        Otci {
            executor,
            caps: CapabilityCache::new(),
        }
    }

    pub fn executor(&self) -> &Executor<T> {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut Executor<T> {
        &mut self.executor
    }

    pub fn into_executor(self) -> Executor<T> {
        self.executor
    }

    pub fn stats(&self) -> ExecutorStats {
        self.executor.stats()
    }

    // ========================================================================
    // Executor passthrough
    // ========================================================================

    /// Execute a raw command and return its payload lines.
    pub fn execute(&mut self, cmd: impl Into<CommandInvocation>) -> OtciResult<Vec<String>> {
        self.executor.execute(cmd)
    }

    /// Let `duration` pass, optionally returning early on `expect_line`.
    pub fn wait(&mut self, duration: Duration, expect_line: Option<&LinePattern>) -> OtciResult<Vec<String>> {
        self.executor.wait(duration, expect_line)
    }

    /// Re-run `cmd` until its output matches `expect_line`.
    pub fn wait_for(&mut self, cmd: &str, expect_line: &LinePattern, timeout: Duration) -> OtciResult<Vec<String>> {
        self.executor.wait_for(cmd, expect_line, timeout)
    }

    pub fn is_command_supported(&mut self, cmd: &str) -> OtciResult<bool> {
        self.executor.is_command_supported(cmd)
    }

    pub fn set_retry_count(&mut self, count: u32) {
        self.executor.set_retry_count(count);
    }

    pub fn set_log_label(&mut self, label: Option<String>) {
        self.executor.set_log_label(label);
    }

    pub fn set_filter(&mut self, filter: Option<LinePattern>) {
        self.executor.set_filter(filter);
    }

    pub fn set_line_read_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.executor.set_line_read_callback(callback);
    }

    pub fn close(&mut self) -> OtciResult<()> {
        self.executor.close()
    }

    /// Execute a command whose payload carries nothing of interest.
    pub(crate) fn run(&mut self, cmd: impl Into<CommandInvocation>) -> OtciResult<()> {
        self.executor.execute(cmd).map(drop)
    }

    // ========================================================================
    // Version and capabilities
    // ========================================================================

    /// API version from `version api`, fetched once per connection.
    ///
    /// Firmware too old to know the command prints its version string
    /// instead; that counts as version 0.
    pub fn api_version(&mut self) -> OtciResult<u32> {
        if let Some(v) = self.caps.api_version() {
            return Ok(v);
        }

        let output = self.executor.execute("version api")?;
        let version = match parse_int(&output, 10) {
            Ok(v) => u32::try_from(v).unwrap_or(0),
            Err(OtciError::UnexpectedOutput { .. }) => 0,
            Err(e) => return Err(e),
        };
        debug!("Otci: api version {}", version);
        self.caps.set_api_version(version);
        Ok(version)
    }

    /// Firmware version string, cached.
    pub fn version(&mut self) -> OtciResult<String> {
        if let Some(v) = self.caps.version() {
            return Ok(v.to_string());
        }
        let output = self.executor.execute("version")?;
        let version = parse_str(&output)?.to_string();
        self.caps.set_version(version.clone());
        Ok(version)
    }

    /// Thread protocol version, cached.
    pub fn thread_version(&mut self) -> OtciResult<u32> {
        if let Some(v) = self.caps.thread_version() {
            return Ok(v);
        }
        let output = self.executor.execute("thread version")?;
        let version = otci_protocol::parse_int_as(&output, 10)?;
        self.caps.set_thread_version(version);
        Ok(version)
    }

    /// Keyword for `capability` on this device.
    pub fn keyword(&mut self, capability: Capability) -> OtciResult<&'static str> {
        let api_version = self.api_version()?;
        Ok(capability.keyword(api_version))
    }

    pub fn capabilities(&self) -> &CapabilityCache {
        &self.caps
    }

    /// Forget cached version facts, e.g. after flashing new firmware.
    pub fn reset_capabilities(&mut self) {
        self.caps.reset();
    }
}

impl<T: Transport> std::fmt::Debug for Otci<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Otci")
            .field("executor", &self.executor)
            .field("caps", &self.caps)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use otci_transport::ScriptedTransport;

    /// A facade over a scripted console that never retries.
    pub fn scripted() -> Otci<ScriptedTransport> {
        let mut otci = Otci::new(ScriptedTransport::new());
        otci.set_retry_count(0);
        otci
    }

    /// Same, with the API version already cached.
    pub fn scripted_with_api(version: u32) -> Otci<ScriptedTransport> {
        let mut otci = scripted();
        otci.caps.set_api_version(version);
        otci
    }

    pub fn script(otci: &mut Otci<ScriptedTransport>) -> &mut ScriptedTransport {
        otci.executor_mut().transport_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    #[test]
    fn test_api_version_cached() {
        let mut otci = scripted();
        script(&mut otci).expect("version api", ["350", "Done"]);
        assert_eq!(otci.api_version().unwrap(), 350);
        assert_eq!(otci.api_version().unwrap(), 350);
        assert_eq!(script(&mut otci).sent_count("version api"), 1);
    }

    #[test]
    fn test_api_version_old_firmware() {
        let mut otci = scripted();
        script(&mut otci).expect("version api", ["OPENTHREAD/20191113-00534-gc6a258e3; SIMULATION", "Done"]);
        assert_eq!(otci.api_version().unwrap(), 0);
        assert_eq!(otci.keyword(Capability::NetworkKey).unwrap(), "masterkey");
    }

    #[test]
    fn test_api_version_error_propagates() {
        let mut otci = scripted();
        script(&mut otci).expect("version api", ["Error 1: Failed"]);
        assert!(matches!(otci.api_version(), Err(OtciError::Command(_))));
        assert_eq!(otci.capabilities().api_version(), None);
    }

    #[test]
    fn test_reset_capabilities_refetches() {
        let mut otci = scripted();
        script(&mut otci)
            .expect("version api", ["100", "Done"])
            .expect("version api", ["200", "Done"]);
        assert_eq!(otci.keyword(Capability::NetworkKey).unwrap(), "masterkey");
        otci.reset_capabilities();
        assert_eq!(otci.keyword(Capability::NetworkKey).unwrap(), "networkkey");
    }

    #[test]
    fn test_version_and_thread_version() {
        let mut otci = scripted();
        script(&mut otci)
            .expect("version", ["OPENTHREAD/thread-reference-20200818; SIMULATION", "Done"])
            .expect("thread version", ["4", "Done"]);
        assert!(otci.version().unwrap().starts_with("OPENTHREAD/"));
        assert_eq!(otci.thread_version().unwrap(), 4);
        assert_eq!(otci.thread_version().unwrap(), 4);
        assert_eq!(script(&mut otci).sent_count("thread version"), 1);
    }
}
