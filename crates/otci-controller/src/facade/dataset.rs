//! Operational dataset management.

use otci_protocol::{hex, parse_hex_bytes, parse_field, CommandLine, KeyValues, OtciError, OtciResult};
use otci_transport::Transport;

use super::Otci;
use crate::capability::Capability;
use crate::types::{parse_as, Dataset, DatasetKind, DatasetParams, SecurityPolicy};

fn parse_security_policy(value: &str) -> OtciResult<SecurityPolicy> {
    let mut words = value.split_whitespace();
    let rotation_time = words
        .next()
        .ok_or_else(|| OtciError::unexpected(&[value], "empty security policy"))?;
    Ok(SecurityPolicy {
        rotation_time: parse_field(rotation_time, 10)?,
        flags: words.next().unwrap_or_default().to_string(),
    })
}

/// Decode `dataset`, `dataset active` or `dataset pending`.
///
/// Every key must be known; a firmware printing something new is reported
/// rather than silently dropped.
pub fn parse_dataset<S: AsRef<str>>(output: &[S]) -> OtciResult<Dataset> {
    let mut dataset = Dataset::default();

    for (key, value) in KeyValues::parse(output)?.iter() {
        match key {
            "Active Timestamp" => dataset.active_timestamp = Some(parse_field(value, 10)?),
            "Pending Timestamp" => dataset.pending_timestamp = Some(parse_field(value, 10)?),
            "Delay" => dataset.delay = Some(parse_field(value, 10)?),
            "Channel" => dataset.channel = Some(parse_field(value, 10)?),
            "Wake-up Channel" => dataset.wakeup_channel = Some(parse_field(value, 10)?),
            "Channel Mask" => dataset.channel_mask = Some(parse_field(value, 16)?),
            "Ext PAN ID" => dataset.extpanid = Some(value.to_string()),
            "Mesh Local Prefix" => dataset.mesh_local_prefix = Some(parse_as(value, "a mesh-local prefix")?),
            "Network Key" | "Master Key" => dataset.network_key = Some(value.to_string()),
            "Network Name" => dataset.network_name = Some(value.to_string()),
            "PAN ID" => dataset.panid = Some(parse_field(value, 16)?),
            "PSKc" => dataset.pskc = Some(value.to_string()),
            "Security Policy" => dataset.security_policy = Some(parse_security_policy(value)?),
            _ => return Err(OtciError::unexpected(output, format!("unknown dataset field `{key}`"))),
        }
    }

    Ok(dataset)
}

fn dataset_command(kind: Option<DatasetKind>) -> CommandLine {
    CommandLine::new("dataset").opt_arg(kind)
}

impl<T: Transport> Otci<T> {
    /// Initialise the dataset buffer from the active or pending dataset, or
    /// with fresh random values when neither is requested.
    pub fn dataset_init_buffer(&mut self, from_active: bool, from_pending: bool) -> OtciResult<()> {
        let source = match (from_active, from_pending) {
            (true, true) => {
                return Err(OtciError::InvalidArguments(
                    "cannot initialise from both the active and pending datasets".to_string(),
                ))
            }
            (true, false) => "active",
            (false, true) => "pending",
            (false, false) => "new",
        };
        self.run(format!("dataset init {source}"))
    }

    pub fn dataset_commit_buffer(&mut self, kind: DatasetKind) -> OtciResult<()> {
        self.run(format!("dataset commit {kind}"))
    }

    pub fn dataset_clear_buffer(&mut self) -> OtciResult<()> {
        self.run("dataset clear")
    }

    /// Decoded dataset; `None` reads the buffer.
    pub fn get_dataset(&mut self, kind: Option<DatasetKind>) -> OtciResult<Dataset> {
        let output = self.execute(dataset_command(kind))?;
        parse_dataset(&output)
    }

    /// Raw TLVs of the active or pending dataset.
    pub fn get_dataset_bytes(&mut self, kind: DatasetKind) -> OtciResult<Vec<u8>> {
        let flag = self.keyword(Capability::BinaryFlag)?;
        let output = self.execute(dataset_command(Some(kind)).arg(flag))?;
        parse_hex_bytes(&output)
    }

    /// Replace the active or pending dataset with raw TLVs.
    pub fn set_dataset_bytes(&mut self, kind: DatasetKind, tlvs: &[u8]) -> OtciResult<()> {
        self.run(format!("dataset set {kind} {}", hex::encode(tlvs)))
    }

    /// Raw TLVs of the dataset buffer.
    pub fn get_dataset_tlvs_bytes(&mut self) -> OtciResult<Vec<u8>> {
        let output = self.execute("dataset tlvs")?;
        parse_hex_bytes(&output)
    }

    /// Write the given fields into the dataset buffer, one command per field.
    pub fn dataset_set_buffer(&mut self, params: &DatasetParams) -> OtciResult<()> {
        if let Some(extpanid) = &params.extpanid {
            hex::validate_hex64(extpanid)?;
        }
        for key in [&params.network_key, &params.pskc].into_iter().flatten() {
            hex::validate_key128(key)?;
        }

        if let Some(ts) = params.active_timestamp {
            self.run(format!("dataset activetimestamp {ts}"))?;
        }
        if let Some(ts) = params.pending_timestamp {
            self.run(format!("dataset pendingtimestamp {ts}"))?;
        }
        if let Some(delay) = params.delay {
            self.run(format!("dataset delay {delay}"))?;
        }
        if let Some(channel) = params.channel {
            self.run(format!("dataset channel {channel}"))?;
        }
        if let Some(channel) = params.wakeup_channel {
            self.run(format!("dataset wakeupchannel {channel}"))?;
        }
        if let Some(mask) = params.channel_mask {
            self.run(format!("dataset channelmask {mask:#010x}"))?;
        }
        if let Some(extpanid) = &params.extpanid {
            self.run(format!("dataset extpanid {extpanid}"))?;
        }
        if let Some(prefix) = &params.mesh_local_prefix {
            self.run(format!("dataset meshlocalprefix {}", prefix.addr))?;
        }
        if let Some(key) = &params.network_key {
            let keyword = self.keyword(Capability::NetworkKey)?;
            self.run(format!("dataset {keyword} {key}"))?;
        }
        if let Some(name) = &params.network_name {
            self.run(CommandLine::new("dataset networkname").text_arg(name))?;
        }
        if let Some(panid) = params.panid {
            self.run(format!("dataset panid {panid:#06x}"))?;
        }
        if let Some(pskc) = &params.pskc {
            self.run(format!("dataset pskc {pskc}"))?;
        }
        if let Some(policy) = &params.security_policy {
            let line = CommandLine::new("dataset securitypolicy").arg(policy.rotation_time);
            let line = if policy.flags.is_empty() { line } else { line.arg(&policy.flags) };
            self.run(line)?;
        }
        Ok(())
    }

    /// Build a fresh dataset with `params` applied and return its TLVs.
    pub fn create_dataset(&mut self, params: &DatasetParams) -> OtciResult<Vec<u8>> {
        self.dataset_clear_buffer()?;
        self.dataset_init_buffer(false, false)?;
        self.dataset_set_buffer(params)?;
        self.get_dataset_tlvs_bytes()
    }

    /// Attach to the network described by `tlvs`.
    pub fn join(&mut self, tlvs: &[u8]) -> OtciResult<()> {
        self.set_dataset_bytes(DatasetKind::Active, tlvs)?;
        self.ifconfig_up()?;
        self.thread_start()
    }

    /// Detach and bring the interface down.
    pub fn leave(&mut self) -> OtciResult<()> {
        self.thread_stop()?;
        self.ifconfig_down()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use otci_protocol::Ip6Prefix;

    const ACTIVE: [&str; 11] = [
        "Active Timestamp: 1",
        "Channel: 22",
        "Channel Mask: 0x07fff800",
        "Ext PAN ID: 5c93ae980ff22d35",
        "Mesh Local Prefix: fdc7:55fe:6363:bd01::/64",
        "Network Key: d1a8348d59fb1fac1d6c4f95007d9cc6",
        "Network Name: OpenThread-7caa",
        "PAN ID: 0x7caa",
        "PSKc: 167d89fd169e439ca0b8266de248090f",
        "Security Policy: 672 onrc 0",
        "Done",
    ];

    #[test]
    fn test_parse_active_dataset() {
        let mut otci = scripted();
        script(&mut otci).expect("dataset active", ACTIVE);
        let dataset = otci.get_dataset(Some(DatasetKind::Active)).unwrap();
        assert_eq!(dataset.active_timestamp, Some(1));
        assert_eq!(dataset.channel, Some(22));
        assert_eq!(dataset.channel_mask, Some(0x07fff800));
        assert_eq!(dataset.panid, Some(0x7caa));
        assert_eq!(dataset.mesh_local_prefix.map(|p| p.len), Some(64));
        assert_eq!(dataset.network_name.as_deref(), Some("OpenThread-7caa"));
        let policy = dataset.security_policy.unwrap();
        assert_eq!(policy.rotation_time, 672);
        assert_eq!(policy.flags, "onrc");
        assert_eq!(dataset.pending_timestamp, None);
    }

    #[test]
    fn test_parse_dataset_legacy_and_unknown_keys() {
        let dataset = parse_dataset(&["Master Key: 00112233445566778899aabbccddeeff"]).unwrap();
        assert!(dataset.network_key.is_some());
        assert!(matches!(
            parse_dataset(&["Shiny New Field: 1"]),
            Err(OtciError::UnexpectedOutput { .. })
        ));
    }

    #[test]
    fn test_init_buffer_conflict() {
        let mut otci = scripted();
        assert!(matches!(otci.dataset_init_buffer(true, true), Err(OtciError::InvalidArguments(_))));
        assert!(script(&mut otci).sent().is_empty());

        script(&mut otci).expect("dataset init pending", ["Done"]);
        otci.dataset_init_buffer(false, true).unwrap();
    }

    #[test]
    fn test_create_dataset() {
        let mut otci = scripted_with_api(200);
        script(&mut otci)
            .expect("dataset clear", ["Done"])
            .expect("dataset init new", ["Done"])
            .expect("dataset channel 15", ["Done"])
            .expect("dataset channelmask 0x07fff800", ["Done"])
            .expect("dataset meshlocalprefix fdde:ad00:beef::", ["Done"])
            .expect("dataset networkkey 00112233445566778899aabbccddeeff", ["Done"])
            .expect("dataset networkname my\\ mesh", ["Done"])
            .expect("dataset panid 0xface", ["Done"])
            .expect("dataset securitypolicy 672 onrc", ["Done"])
            .expect("dataset tlvs", ["0e080000000000010000", "Done"]);

        let params = DatasetParams {
            channel: Some(15),
            channel_mask: Some(0x07fff800),
            mesh_local_prefix: "fdde:ad00:beef::/64".parse::<Ip6Prefix>().ok(),
            network_key: Some("00112233445566778899aabbccddeeff".to_string()),
            network_name: Some("my mesh".to_string()),
            panid: Some(0xface),
            security_policy: Some(SecurityPolicy { rotation_time: 672, flags: "onrc".to_string() }),
            ..Default::default()
        };
        let tlvs = otci.create_dataset(&params).unwrap();
        assert_eq!(tlvs, vec![0x0e, 0x08, 0, 0, 0, 0, 0, 0x01, 0, 0]);
    }

    #[test]
    fn test_set_buffer_validates_first() {
        let mut otci = scripted();
        let params = DatasetParams {
            channel: Some(11),
            extpanid: Some("xyz".to_string()),
            ..Default::default()
        };
        assert!(matches!(otci.dataset_set_buffer(&params), Err(OtciError::InvalidArguments(_))));
        assert!(script(&mut otci).sent().is_empty());
    }

    #[test]
    fn test_dataset_bytes_binary_flag() {
        let mut otci = scripted_with_api(27);
        script(&mut otci).expect("dataset pending binary", ["0e08", "Done"]);
        assert_eq!(otci.get_dataset_bytes(DatasetKind::Pending).unwrap(), vec![0x0e, 0x08]);

        let mut otci = scripted_with_api(28);
        script(&mut otci).expect("dataset active -x", ["0e08", "Done"]);
        assert_eq!(otci.get_dataset_bytes(DatasetKind::Active).unwrap(), vec![0x0e, 0x08]);
    }

    #[test]
    fn test_join_and_leave() {
        let mut otci = scripted();
        script(&mut otci)
            .expect("dataset set active 0e08", ["Done"])
            .expect("ifconfig up", ["Done"])
            .expect("thread start", ["Done"])
            .expect("thread stop", ["Done"])
            .expect("ifconfig down", ["Done"]);
        otci.join(&[0x0e, 0x08]).unwrap();
        otci.leave().unwrap();
        assert_eq!(script(&mut otci).sent().len(), 5);
    }
}
