//! IPv6 unicast and multicast address management.

use std::net::Ipv6Addr;

use otci_protocol::{parse_ip6addr, parse_ip6addr_list, OtciError, OtciResult};
use otci_transport::Transport;

use super::Otci;

impl<T: Transport> Otci<T> {
    // ========================================================================
    // Unicast
    // ========================================================================

    pub fn add_ipaddr(&mut self, addr: Ipv6Addr) -> OtciResult<()> {
        if addr.is_multicast() {
            return Err(OtciError::InvalidArguments(format!("{addr} is a multicast address")));
        }
        self.run(format!("ipaddr add {addr}"))
    }

    pub fn del_ipaddr(&mut self, addr: Ipv6Addr) -> OtciResult<()> {
        self.run(format!("ipaddr del {addr}"))
    }

    /// Every unicast address on the Thread interface.
    pub fn get_ipaddrs(&mut self) -> OtciResult<Vec<Ipv6Addr>> {
        let output = self.execute("ipaddr")?;
        parse_ip6addr_list(&output)
    }

    pub fn has_ipaddr(&mut self, addr: Ipv6Addr) -> OtciResult<bool> {
        Ok(self.get_ipaddrs()?.contains(&addr))
    }

    /// Mesh-local EID.
    pub fn get_ipaddr_mleid(&mut self) -> OtciResult<Ipv6Addr> {
        let output = self.execute("ipaddr mleid")?;
        parse_ip6addr(&output)
    }

    pub fn get_ipaddr_linklocal(&mut self) -> OtciResult<Ipv6Addr> {
        let output = self.execute("ipaddr linklocal")?;
        parse_ip6addr(&output)
    }

    pub fn get_ipaddr_rloc(&mut self) -> OtciResult<Ipv6Addr> {
        let output = self.execute("ipaddr rloc")?;
        parse_ip6addr(&output)
    }

    // ========================================================================
    // Multicast
    // ========================================================================

    /// Subscribe to a multicast group. Already subscribed is fine.
    pub fn add_ipmaddr(&mut self, addr: Ipv6Addr) -> OtciResult<()> {
        if !addr.is_multicast() {
            return Err(OtciError::InvalidArguments(format!("{addr} is not a multicast address")));
        }
        self.run(format!("ipmaddr add {addr}"))
    }

    pub fn del_ipmaddr(&mut self, addr: Ipv6Addr) -> OtciResult<()> {
        self.run(format!("ipmaddr del {addr}"))
    }

    pub fn get_ipmaddrs(&mut self) -> OtciResult<Vec<Ipv6Addr>> {
        let output = self.execute("ipmaddr")?;
        parse_ip6addr_list(&output)
    }

    pub fn has_ipmaddr(&mut self, addr: Ipv6Addr) -> OtciResult<bool> {
        Ok(self.get_ipmaddrs()?.contains(&addr))
    }

    /// Link-local all Thread nodes group.
    pub fn get_ipmaddr_llatn(&mut self) -> OtciResult<Ipv6Addr> {
        let output = self.execute("ipmaddr llatn")?;
        parse_ip6addr(&output)
    }

    /// Realm-local all Thread nodes group.
    pub fn get_ipmaddr_rlatn(&mut self) -> OtciResult<Ipv6Addr> {
        let output = self.execute("ipmaddr rlatn")?;
        parse_ip6addr(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    #[test]
    fn test_get_ipaddrs() {
        let mut otci = scripted();
        script(&mut otci).respond(
            "ipaddr",
            [
                "fdde:ad00:beef:0:0:ff:fe00:fc00",
                "fdde:ad00:beef:0:558:f56b:d688:799",
                "fe80:0:0:0:f3d9:2a82:c8d8:fe43",
                "Done",
            ],
        );
        assert_eq!(otci.get_ipaddrs().unwrap().len(), 3);
        assert!(otci.has_ipaddr("fe80::f3d9:2a82:c8d8:fe43".parse().unwrap()).unwrap());
        assert!(!otci.has_ipaddr("fe80::1".parse().unwrap()).unwrap());
    }

    #[test]
    fn test_ipmaddr_already_subscribed() {
        let mut otci = scripted();
        script(&mut otci).expect("ipmaddr add ff04::1", ["Error 24: Already"]);
        otci.add_ipmaddr("ff04::1".parse().unwrap()).unwrap();
    }

    #[test]
    fn test_address_kind_checked() {
        let mut otci = scripted();
        assert!(matches!(
            otci.add_ipmaddr("fd00::1".parse().unwrap()),
            Err(OtciError::InvalidArguments(_))
        ));
        assert!(matches!(
            otci.add_ipaddr("ff02::1".parse().unwrap()),
            Err(OtciError::InvalidArguments(_))
        ));
        assert!(script(&mut otci).sent().is_empty());
    }

    #[test]
    fn test_named_addresses() {
        let mut otci = scripted();
        script(&mut otci)
            .expect("ipaddr rloc", ["fdde:ad00:beef:0:0:ff:fe00:fc00", "Done"])
            .expect("ipmaddr rlatn", ["ff33:40:fdde:ad00:beef:0:0:1", "Done"]);
        assert_eq!(otci.get_ipaddr_rloc().unwrap().segments()[7], 0xfc00);
        assert!(otci.get_ipmaddr_rlatn().unwrap().is_multicast());
    }
}
