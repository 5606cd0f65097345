//! Shell command builders for Open vSwitch and ip(8) operations

use crate::shell;
use mobinet_types::PortNo;

/// Fail mode applied to every bridge at creation
pub const FAIL_MODE: &str = "secure";

/// OpenFlow protocol version spoken to bridges
pub const OF_PROTOCOL: &str = "OpenFlow13";

/// Build bridge creation command
///
/// Creates the bridge and pins its fail mode and protocol in one
/// `ovs-vsctl` transaction.
pub fn build_add_bridge_cmd(bridge: &str) -> String {
    let bridge_quoted = shell::shellquote(bridge);
    format!(
        "{} add-br {} -- set bridge {} fail_mode={} protocols={}",
        shell::OVS_VSCTL_CMD,
        bridge_quoted,
        bridge_quoted,
        FAIL_MODE,
        OF_PROTOCOL
    )
}

/// Build bridge deletion command
///
/// Uses `--if-exists` so tearing down a half-built topology is idempotent.
pub fn build_del_bridge_cmd(bridge: &str) -> String {
    format!(
        "{} --if-exists del-br {}",
        shell::OVS_VSCTL_CMD,
        shell::shellquote(bridge)
    )
}

/// Build plain port attachment command
///
/// Legacy dialect: the datapath assigns whatever OpenFlow port number
/// it likes.
pub fn build_add_port_cmd(bridge: &str, intf: &str) -> String {
    format!(
        "{} add-port {} {}",
        shell::OVS_VSCTL_CMD,
        shell::shellquote(bridge),
        shell::shellquote(intf)
    )
}

/// Build port attachment command with an OpenFlow port request
///
/// Modern dialect: asks the datapath to honor the requested port number
/// via `ofport_request`.
pub fn build_add_port_with_request_cmd(bridge: &str, intf: &str, port: PortNo) -> String {
    let intf_quoted = shell::shellquote(intf);
    format!(
        "{} add-port {} {} -- set Interface {} ofport_request={}",
        shell::OVS_VSCTL_CMD,
        shell::shellquote(bridge),
        intf_quoted,
        intf_quoted,
        port
    )
}

/// Build port detachment command
pub fn build_del_port_cmd(bridge: &str, intf: &str) -> String {
    format!(
        "{} del-port {} {}",
        shell::OVS_VSCTL_CMD,
        shell::shellquote(bridge),
        shell::shellquote(intf)
    )
}

/// Build OpenFlow port query command
///
/// Prints the port number the datapath actually assigned.
pub fn build_get_ofport_cmd(intf: &str) -> String {
    format!(
        "{} get Interface {} ofport",
        shell::OVS_VSCTL_CMD,
        shell::shellquote(intf)
    )
}

/// Build controller assignment command
pub fn build_set_controller_cmd(bridge: &str, target: &str) -> String {
    format!(
        "{} set-controller {} {}",
        shell::OVS_VSCTL_CMD,
        shell::shellquote(bridge),
        shell::shellquote(target)
    )
}

/// Build flow table flush command
pub fn build_clear_flows_cmd(bridge: &str) -> String {
    format!(
        "{} -O {} del-flows {}",
        shell::OVS_OFCTL_CMD,
        OF_PROTOCOL,
        shell::shellquote(bridge)
    )
}

/// Build version probe command
pub fn build_version_cmd() -> String {
    format!("{} --version", shell::OVS_VSCTL_CMD)
}

/// Build link admin-up command
pub fn build_link_up_cmd(dev: &str) -> String {
    format!("{} link set {} up", shell::IP_CMD, shell::shellquote(dev))
}

/// Build link admin-down command
pub fn build_link_down_cmd(dev: &str) -> String {
    format!("{} link set {} down", shell::IP_CMD, shell::shellquote(dev))
}

/// Build link rename command
///
/// The kernel rejects renames of interfaces that are administratively
/// up, so callers must bring the link down first.
pub fn build_link_rename_cmd(old: &str, new: &str) -> String {
    format!(
        "{} link set {} name {}",
        shell::IP_CMD,
        shell::shellquote(old),
        shell::shellquote(new)
    )
}

/// Build veth pair creation command
pub fn build_veth_add_cmd(a: &str, b: &str) -> String {
    format!(
        "{} link add {} type veth peer name {}",
        shell::IP_CMD,
        shell::shellquote(a),
        shell::shellquote(b)
    )
}

/// Build link deletion command
pub fn build_link_del_cmd(dev: &str) -> String {
    format!("{} link del {}", shell::IP_CMD, shell::shellquote(dev))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_add_bridge_cmd() {
        let cmd = build_add_bridge_cmd("s1");
        assert!(cmd.contains("add-br \"s1\""));
        assert!(cmd.contains("fail_mode=secure"));
        assert!(cmd.contains("protocols=OpenFlow13"));
    }

    #[test]
    fn test_build_del_bridge_cmd() {
        let cmd = build_del_bridge_cmd("s1");
        assert!(cmd.contains("--if-exists del-br \"s1\""));
    }

    #[test]
    fn test_build_add_port_cmd() {
        let cmd = build_add_port_cmd("s1", "s1-eth3");
        assert!(cmd.contains("add-port \"s1\" \"s1-eth3\""));
        assert!(!cmd.contains("ofport_request"));
    }

    #[test]
    fn test_build_add_port_with_request_cmd() {
        let port = PortNo::new(7).unwrap();
        let cmd = build_add_port_with_request_cmd("s2", "s2-eth7", port);
        assert!(cmd.contains("add-port \"s2\" \"s2-eth7\""));
        assert!(cmd.contains("set Interface \"s2-eth7\" ofport_request=7"));
    }

    #[test]
    fn test_build_del_port_cmd() {
        let cmd = build_del_port_cmd("s1", "s1-eth3");
        assert!(cmd.contains("del-port \"s1\" \"s1-eth3\""));
    }

    #[test]
    fn test_build_get_ofport_cmd() {
        let cmd = build_get_ofport_cmd("s2-eth7");
        assert!(cmd.contains("get Interface \"s2-eth7\" ofport"));
    }

    #[test]
    fn test_build_set_controller_cmd() {
        let cmd = build_set_controller_cmd("s1", "tcp:127.0.0.1:6653");
        assert!(cmd.contains("set-controller \"s1\""));
        assert!(cmd.contains("tcp:127.0.0.1:6653"));
    }

    #[test]
    fn test_build_clear_flows_cmd() {
        let cmd = build_clear_flows_cmd("s1");
        assert!(cmd.contains("del-flows \"s1\""));
        assert!(cmd.contains("-O OpenFlow13"));
    }

    #[test]
    fn test_build_link_rename_cmd() {
        let cmd = build_link_rename_cmd("s1-eth3", "s2-eth7");
        assert!(cmd.contains("link set \"s1-eth3\" name \"s2-eth7\""));
    }

    #[test]
    fn test_build_veth_add_cmd() {
        let cmd = build_veth_add_cmd("h1-eth0", "s1-eth1");
        assert!(cmd.contains("link add \"h1-eth0\" type veth peer name \"s1-eth1\""));
    }

    #[test]
    fn test_shellquote_safety() {
        // Dangerous characters in a bridge name stay inside the quotes
        let cmd = build_add_port_cmd("s1; rm -rf /", "s1-eth1");
        assert!(cmd.contains("\"s1; rm -rf /\""));
    }
}
