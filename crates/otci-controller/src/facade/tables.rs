//! Router, child and neighbor tables, plus leader data.

use std::net::Ipv6Addr;

use otci_protocol::{parse_field, parse_ip6addr_str, parse_str, KeyValues, OtciError, OtciResult, Row, Table};
use otci_transport::Transport;

use super::Otci;
use crate::config::CommandInvocation;
use crate::types::{
    parse_as, ChildId, ChildInfo, ChildTableEntry, DeviceMode, LeaderData, NeighborTableEntry, PartitionId,
    Rloc16, RouterId, RouterInfo, RouterTableEntry,
};

// ============================================================================
// Decoders
// ============================================================================

fn row_mode(row: &Row<'_>) -> OtciResult<DeviceMode> {
    Ok(DeviceMode::from_flags(row.flag("R")?, row.flag("D")?, row.flag("N")?))
}

/// Decode `router table`. Returns the entries and whether the `Link` column
/// was present; without it every `link` is `false`.
fn parse_router_table<S: AsRef<str>>(output: &[S]) -> OtciResult<(Vec<RouterTableEntry>, bool)> {
    let table = Table::parse(output)?;
    let has_link = table.has_column("Link");

    let entries = table
        .rows()
        .map(|row| {
            Ok(RouterTableEntry {
                id: RouterId(row.int("ID", 10)?),
                rloc16: row.parse("RLOC16")?,
                next_hop: row.int("Next Hop", 10)?,
                path_cost: row.int("Path Cost", 10)?,
                lq_in: row.int("LQ In", 10)?,
                lq_out: row.int("LQ Out", 10)?,
                age: row.int("Age", 10)?,
                extaddr: row.get("Extended MAC")?.to_string(),
                link: if has_link { row.flag("Link")? } else { false },
            })
        })
        .collect::<OtciResult<Vec<_>>>()?;
    Ok((entries, has_link))
}

/// Decode `router <id>`.
pub fn parse_router_info<S: AsRef<str>>(id: RouterId, output: &[S]) -> OtciResult<RouterInfo> {
    let fields = KeyValues::parse(output)?;
    let next_hop: u16 = fields.int("Next Hop", 16)?;
    Ok(RouterInfo {
        id,
        rloc16: Rloc16(fields.int("Rloc", 16)?),
        alloc: fields.int::<u8>("Alloc", 10)? != 0,
        next_hop: RouterId((next_hop >> 10) as u8),
        link: fields.int::<u8>("Link", 10)? != 0,
    })
}

/// Decode `child table`. `Ver`, `CSL`, `QMsgCnt` and `Suprvsn` are only
/// printed by newer firmware.
pub fn parse_child_table<S: AsRef<str>>(output: &[S]) -> OtciResult<Vec<ChildTableEntry>> {
    let table = Table::parse(output)?;
    table
        .rows()
        .map(|row| {
            Ok(ChildTableEntry {
                id: ChildId(row.int("ID", 10)?),
                rloc16: row.parse("RLOC16")?,
                timeout: row.int("Timeout", 10)?,
                age: row.int("Age", 10)?,
                lq_in: row.int("LQ In", 10)?,
                c_vn: row.int("C_VN", 10)?,
                mode: row_mode(&row)?,
                extaddr: row.get("Extended MAC")?.to_string(),
                ver: row.int_opt("Ver", 10)?,
                csl: row.int_opt::<u8>("CSL", 10)?.map(|v| v != 0),
                qmsgcnt: row.int_opt("QMsgCnt", 10)?,
                suprvsn: row.int_opt("Suprvsn", 10)?,
            })
        })
        .collect()
}

/// Decode `neighbor table`.
pub fn parse_neighbor_table<S: AsRef<str>>(output: &[S]) -> OtciResult<Vec<NeighborTableEntry>> {
    let table = Table::parse(output)?;
    table
        .rows()
        .map(|row| {
            Ok(NeighborTableEntry {
                is_router: row.get("Role")? == "R",
                rloc16: row.parse("RLOC16")?,
                age: row.int("Age", 10)?,
                avg_rssi: row.int("Avg RSSI", 10)?,
                last_rssi: row.int("Last RSSI", 10)?,
                mode: row_mode(&row)?,
                extaddr: row.get("Extended MAC")?.to_string(),
            })
        })
        .collect()
}

/// Decode `child <id>`. Unknown keys are ignored.
pub fn parse_child_info<S: AsRef<str>>(output: &[S]) -> OtciResult<ChildInfo> {
    let fields = KeyValues::parse(output)?;
    Ok(ChildInfo {
        id: fields.int_opt("Child ID", 10)?.map(ChildId),
        rloc16: fields.int_opt("Rloc", 16)?.map(Rloc16),
        extaddr: fields.get("Ext Addr").map(str::to_string),
        mode: fields.get("Mode").map(|m| parse_as(m, "a device mode")).transpose()?,
        c_vn: fields.int_opt("Net Data", 10)?,
        timeout: fields.int_opt("Timeout", 10)?,
        age: fields.int_opt("Age", 10)?,
        lq_in: fields.int_opt("Link Quality In", 10)?,
        rssi: fields.int_opt("RSSI", 10)?,
    })
}

/// Decode `leaderdata`.
pub fn parse_leader_data<S: AsRef<str>>(output: &[S]) -> OtciResult<LeaderData> {
    let fields = KeyValues::parse(output)?;
    Ok(LeaderData {
        partition_id: PartitionId(fields.int("Partition ID", 10)?),
        weighting: fields.int("Weighting", 10)?,
        data_version: fields.int("Data Version", 10)?,
        stable_data_version: fields.int("Stable Data Version", 10)?,
        leader_router_id: RouterId(fields.int("Leader Router ID", 10)?),
    })
}

/// Decode a single line of ids; no line at all means an empty list.
fn parse_id_list<S: AsRef<str>, I>(output: &[S], radix: u32) -> OtciResult<Vec<I>>
where
    I: TryFrom<i64>,
{
    if output.is_empty() {
        return Ok(Vec::new());
    }
    parse_str(output)?
        .split_whitespace()
        .map(|word| parse_field(word, radix))
        .collect()
}

/// Decode `childip` lines (`<rloc16>: <address>`).
fn parse_child_ips<S: AsRef<str>>(output: &[S]) -> OtciResult<Vec<(Rloc16, Ipv6Addr)>> {
    output
        .iter()
        .map(|line| {
            let line = line.as_ref();
            let (rloc, ip) = line
                .split_once(": ")
                .ok_or_else(|| OtciError::unexpected(&[line], "expected `<rloc16>: <address>`"))?;
            Ok((rloc.parse::<Rloc16>()?, parse_ip6addr_str(ip)?))
        })
        .collect()
}

// ============================================================================
// Operations
// ============================================================================

impl<T: Transport> Otci<T> {
    /// Router table. Firmware without a `Link` column is asked for each
    /// router individually.
    pub fn get_router_table(&mut self) -> OtciResult<Vec<RouterTableEntry>> {
        let output = self.execute("router table")?;
        let (mut entries, has_link) = parse_router_table(&output)?;
        if !has_link {
            for entry in &mut entries {
                entry.link = self.router_info(entry.id, true)?.link;
            }
        }
        Ok(entries)
    }

    pub fn get_router_info(&mut self, id: RouterId) -> OtciResult<RouterInfo> {
        self.router_info(id, false)
    }

    fn router_info(&mut self, id: RouterId, silent: bool) -> OtciResult<RouterInfo> {
        let mut inv = CommandInvocation::new(format!("router {id}"));
        if silent {
            inv = inv.silent();
        }
        let output = self.execute(inv)?;
        parse_router_info(id, &output)
    }

    /// Allocated router ids.
    pub fn get_router_list(&mut self) -> OtciResult<Vec<RouterId>> {
        let output = self.execute("router list")?;
        Ok(parse_id_list(&output, 10)?.into_iter().map(RouterId).collect())
    }

    pub fn get_child_table(&mut self) -> OtciResult<Vec<ChildTableEntry>> {
        let output = self.execute("child table")?;
        parse_child_table(&output)
    }

    pub fn get_child_list(&mut self) -> OtciResult<Vec<ChildId>> {
        let output = self.execute("child list")?;
        Ok(parse_id_list(&output, 10)?.into_iter().map(ChildId).collect())
    }

    pub fn get_child_info(&mut self, id: ChildId) -> OtciResult<ChildInfo> {
        let output = self.execute(format!("child {id}"))?;
        parse_child_info(&output)
    }

    /// Mesh-local addresses registered by each child.
    pub fn get_child_ips(&mut self) -> OtciResult<Vec<(Rloc16, Ipv6Addr)>> {
        let output = self.execute("childip")?;
        parse_child_ips(&output)
    }

    pub fn get_neighbor_table(&mut self) -> OtciResult<Vec<NeighborTableEntry>> {
        let output = self.execute("neighbor table")?;
        parse_neighbor_table(&output)
    }

    pub fn get_neighbor_list(&mut self) -> OtciResult<Vec<Rloc16>> {
        let output = self.execute("neighbor list")?;
        Ok(parse_id_list(&output, 16)?.into_iter().map(Rloc16).collect())
    }

    pub fn get_leader_data(&mut self) -> OtciResult<LeaderData> {
        let output = self.execute("leaderdata")?;
        parse_leader_data(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::executor::test_util::capture_logs;

    const ROUTER_TABLE: [&str; 5] = [
        "| ID | RLOC16 | Next Hop | Path Cost | LQ In | LQ Out | Age | Extended MAC     | Link |",
        "+----+--------+----------+-----------+-------+--------+-----+------------------+------+",
        "| 21 | 0x5400 |       21 |         0 |     3 |      3 |   5 | d28d7f875888fccb |    1 |",
        "| 56 | 0xe000 |       56 |         0 |     0 |      0 | 182 | f2d92a82c8d8fe43 |    0 |",
        "Done",
    ];

    #[test]
    fn test_router_table_with_link() {
        let mut otci = scripted();
        script(&mut otci).expect("router table", ROUTER_TABLE);
        let table = otci.get_router_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].id, RouterId(21));
        assert_eq!(table[0].rloc16, Rloc16(0x5400));
        assert!(table[0].link);
        assert!(!table[1].link);
        assert_eq!(table[1].age, 182);
        assert_eq!(script(&mut otci).sent(), ["router table"]);
    }

    #[test]
    fn test_router_table_link_fallback() {
        let mut otci = scripted();
        script(&mut otci)
            .expect(
                "router table",
                [
                    "| ID | RLOC16 | Next Hop | Path Cost | LQ In | LQ Out | Age | Extended MAC     |",
                    "+----+--------+----------+-----------+-------+--------+-----+------------------+",
                    "| 21 | 0x5400 |       21 |         0 |     3 |      3 |   5 | d28d7f875888fccb |",
                    "Done",
                ],
            )
            .expect(
                "router 21",
                ["Alloc: 1", "Router ID: 21", "Rloc: 5400", "Next Hop: 5400", "Link: 1", "Done"],
            );
        let (table, logs) = capture_logs(|| otci.get_router_table().unwrap());
        assert!(table[0].link);
        assert_eq!(script(&mut otci).sent(), ["router table", "router 21"]);
        assert!(logs.contains("> router table"), "{logs}");
        assert!(!logs.contains("> router 21"), "{logs}");
        assert!(!logs.contains("Link: 1"), "{logs}");
    }

    #[test]
    fn test_router_info_logged() {
        let mut otci = scripted();
        script(&mut otci).expect("router 21", ["Alloc: 1", "Rloc: 5400", "Next Hop: 5400", "Link: 1", "Done"]);
        let (info, logs) = capture_logs(|| otci.get_router_info(RouterId(21)).unwrap());
        assert!(info.link);
        assert!(logs.contains("> router 21"), "{logs}");
    }

    #[test]
    fn test_router_info_next_hop() {
        let info = parse_router_info(RouterId(50), &["Alloc: 1", "Rloc: c800", "Next Hop: fc00", "Link: 0"]).unwrap();
        assert_eq!(info.rloc16, Rloc16(0xc800));
        assert_eq!(info.next_hop, RouterId(63));
        assert!(info.alloc);
        assert!(!info.link);
    }

    #[test]
    fn test_child_table_columns() {
        let old = [
            "| ID  | RLOC16 | Timeout    | Age        | LQ In | C_VN |R|D|N| Extended MAC     |",
            "+-----+--------+------------+------------+-------+------+-+-+-+------------------+",
            "|   1 | 0xc801 |        240 |         24 |     3 |  131 |1|0|0| 4ecede68435358ac |",
        ];
        let entries = parse_child_table(&old).unwrap();
        assert_eq!(entries[0].id, ChildId(1));
        assert_eq!(entries[0].mode.to_string(), "r");
        assert_eq!(entries[0].ver, None);
        assert_eq!(entries[0].csl, None);

        let new = [
            "| ID  | RLOC16 | Timeout    | Age        | LQ In | C_VN |R|D|N|Ver|CSL|QMsgCnt|Suprvsn| Extended MAC     |",
            "+-----+--------+------------+------------+-------+------+-+-+-+---+---+-------+-------+------------------+",
            "|   2 | 0xc802 |        240 |          2 |     3 |  131 |0|0|0|  4|  1|      0|    129| a6cc7da3d4f8e5ab |",
        ];
        let entries = parse_child_table(&new).unwrap();
        assert_eq!(entries[0].mode, DeviceMode::default());
        assert_eq!(entries[0].ver, Some(4));
        assert_eq!(entries[0].csl, Some(true));
        assert_eq!(entries[0].qmsgcnt, Some(0));
        assert_eq!(entries[0].suprvsn, Some(129));
    }

    #[test]
    fn test_neighbor_table() {
        let output = [
            "| Role | RLOC16 | Age | Avg RSSI | Last RSSI |R|D|N| Extended MAC     |",
            "+------+--------+-----+----------+-----------+-+-+-+------------------+",
            "|   C  | 0xcc01 |  96 |      -46 |       -46 |1|1|1| 1eb9ba8a6522636b |",
            "|   R  | 0xc800 |   2 |      -29 |       -29 |1|1|1| 9a91556102c39ddb |",
        ];
        let entries = parse_neighbor_table(&output).unwrap();
        assert!(!entries[0].is_router);
        assert!(entries[1].is_router);
        assert_eq!(entries[0].avg_rssi, -46);
        assert_eq!(entries[1].mode.to_string(), "rdn");
    }

    #[test]
    fn test_child_info() {
        let info = parse_child_info(&[
            "Child ID: 1",
            "Rloc: 9c01",
            "Ext Addr: e2b3540590b0fd87",
            "Mode: rn",
            "Net Data: 184",
            "Timeout: 100",
            "Age: 0",
            "Link Quality In: 3",
            "RSSI: -20",
        ])
        .unwrap();
        assert_eq!(info.id, Some(ChildId(1)));
        assert_eq!(info.rloc16, Some(Rloc16(0x9c01)));
        assert_eq!(info.mode.map(|m| m.to_string()).as_deref(), Some("rn"));
        assert_eq!(info.rssi, Some(-20));
    }

    #[test]
    fn test_leader_data() {
        let data = parse_leader_data(&[
            "Partition ID: 1077744240",
            "Weighting: 64",
            "Data Version: 109",
            "Stable Data Version: 211",
            "Leader Router ID: 60",
        ])
        .unwrap();
        assert_eq!(data.partition_id, PartitionId(1077744240));
        assert_eq!(data.leader_router_id, RouterId(60));
        assert!(parse_leader_data(&["Partition ID: 1"]).is_err());
    }

    #[test]
    fn test_lists() {
        let mut otci = scripted();
        script(&mut otci)
            .expect("router list", ["8 24 50", "Done"])
            .expect("child list", ["Done"])
            .expect("neighbor list", ["0xcc01 0xc800", "Done"])
            .expect("childip", ["cc01: fdde:ad00:beef:0:3037:3e03:8c5f:bc0c", "Done"]);
        assert_eq!(otci.get_router_list().unwrap(), vec![RouterId(8), RouterId(24), RouterId(50)]);
        assert!(otci.get_child_list().unwrap().is_empty());
        assert_eq!(otci.get_neighbor_list().unwrap(), vec![Rloc16(0xcc01), Rloc16(0xc800)]);
        let ips = otci.get_child_ips().unwrap();
        assert_eq!(ips[0].0, Rloc16(0xcc01));
    }
}
