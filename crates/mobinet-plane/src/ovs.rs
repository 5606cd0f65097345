//! Open vSwitch forwarding-plane client.

use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use tracing::{debug, info};

use mobinet_types::{ControllerEndpoint, PortNo};

use crate::commands;
use crate::error::{PlaneError, PlaneResult};
use crate::plane::{ForwardingPlane, PlaneVersion};
use crate::shell;

/// Matches the release number in `ovs-vsctl --version` output,
/// e.g. `ovs-vsctl (Open vSwitch) 2.17.9`.
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Open vSwitch\) (\d+)\.(\d+)").expect("Invalid regex pattern"));

/// Forwarding plane backed by `ovs-vsctl`/`ovs-ofctl` on the local host.
///
/// The datapath dialect is probed once on first use and cached for the
/// lifetime of the client; every switch sharing the client sees the
/// same answer.
#[derive(Debug, Default)]
pub struct OvsPlane {
    version_cache: OnceCell<PlaneVersion>,
}

impl OvsPlane {
    /// Creates a client with an unprobed version cache.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Extracts the command dialect from `ovs-vsctl --version` output.
fn parse_version(output: &str) -> PlaneResult<PlaneVersion> {
    let caps = VERSION_RE
        .captures(output)
        .ok_or_else(|| PlaneError::unparseable("version", output))?;
    let major: u32 = caps[1]
        .parse()
        .map_err(|_| PlaneError::unparseable("version", output))?;
    let minor: u32 = caps[2]
        .parse()
        .map_err(|_| PlaneError::unparseable("version", output))?;
    Ok(PlaneVersion::from_release(major, minor))
}

/// Parses `ovs-vsctl get Interface <x> ofport` output.
///
/// The datapath prints `-1` for an interface stuck without an OpenFlow
/// port and `[]` for an unknown one; both are reported as unparseable
/// rather than mapped to a fake number.
fn parse_ofport(output: &str) -> PlaneResult<PortNo> {
    let raw: i64 = output
        .trim()
        .parse()
        .map_err(|_| PlaneError::unparseable("ofport", output))?;
    let no = u32::try_from(raw).map_err(|_| PlaneError::unparseable("ofport", output))?;
    PortNo::new(no).map_err(|_| PlaneError::unparseable("ofport", output))
}

#[async_trait]
impl ForwardingPlane for OvsPlane {
    async fn create_bridge(&self, bridge: &str) -> PlaneResult<()> {
        info!(bridge = %bridge, "Creating bridge");
        shell::exec_or_throw(&commands::build_add_bridge_cmd(bridge)).await?;
        Ok(())
    }

    async fn delete_bridge(&self, bridge: &str) -> PlaneResult<()> {
        info!(bridge = %bridge, "Deleting bridge");
        shell::exec_or_throw(&commands::build_del_bridge_cmd(bridge)).await?;
        Ok(())
    }

    async fn set_controller(&self, bridge: &str, target: &ControllerEndpoint) -> PlaneResult<()> {
        info!(bridge = %bridge, target = %target, "Setting controller");
        shell::exec_or_throw(&commands::build_set_controller_cmd(bridge, &target.target()))
            .await?;
        Ok(())
    }

    async fn bind_port(
        &self,
        bridge: &str,
        intf: &str,
        request: Option<PortNo>,
    ) -> PlaneResult<()> {
        let cmd = match request {
            Some(port) => commands::build_add_port_with_request_cmd(bridge, intf, port),
            None => commands::build_add_port_cmd(bridge, intf),
        };
        debug!(bridge = %bridge, intf = %intf, request = ?request, "Binding port");
        shell::exec_or_throw(&cmd).await?;
        Ok(())
    }

    async fn unbind_port(&self, bridge: &str, intf: &str) -> PlaneResult<()> {
        debug!(bridge = %bridge, intf = %intf, "Unbinding port");
        shell::exec_or_throw(&commands::build_del_port_cmd(bridge, intf)).await?;
        Ok(())
    }

    async fn query_port(&self, intf: &str) -> PlaneResult<PortNo> {
        let output = shell::exec_or_throw(&commands::build_get_ofport_cmd(intf)).await?;
        parse_ofport(&output)
    }

    async fn clear_flows(&self, bridge: &str) -> PlaneResult<()> {
        debug!(bridge = %bridge, "Clearing flows");
        shell::exec_or_throw(&commands::build_clear_flows_cmd(bridge)).await?;
        Ok(())
    }

    async fn version(&self) -> PlaneResult<PlaneVersion> {
        if let Some(version) = self.version_cache.get() {
            return Ok(*version);
        }
        let output = shell::exec_or_throw(&commands::build_version_cmd()).await?;
        let probed = parse_version(&output)?;
        info!(version = ?probed, "Probed datapath dialect");
        Ok(*self.version_cache.get_or_init(|| probed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_modern() {
        let output = "ovs-vsctl (Open vSwitch) 2.17.9\nDB Schema 8.3.1";
        assert_eq!(parse_version(output).unwrap(), PlaneVersion::Modern);
    }

    #[test]
    fn test_parse_version_legacy() {
        let output = "ovs-vsctl (Open vSwitch) 1.9.3";
        assert_eq!(parse_version(output).unwrap(), PlaneVersion::Legacy);
    }

    #[test]
    fn test_parse_version_threshold() {
        let output = "ovs-vsctl (Open vSwitch) 1.10.0";
        assert_eq!(parse_version(output).unwrap(), PlaneVersion::Modern);
    }

    #[test]
    fn test_parse_version_garbage() {
        let result = parse_version("not a version banner");
        assert!(matches!(
            result,
            Err(PlaneError::UnparseableOutput { what: "version", .. })
        ));
    }

    #[test]
    fn test_parse_ofport() {
        assert_eq!(parse_ofport("7").unwrap(), PortNo::new(7).unwrap());
        assert_eq!(parse_ofport(" 12 \n").unwrap(), PortNo::new(12).unwrap());
    }

    #[test]
    fn test_parse_ofport_unassigned() {
        let result = parse_ofport("-1");
        assert!(matches!(
            result,
            Err(PlaneError::UnparseableOutput { what: "ofport", .. })
        ));
    }

    #[test]
    fn test_parse_ofport_missing_interface() {
        let result = parse_ofport("[]");
        assert!(result.is_err());
    }
}
