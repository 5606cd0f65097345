//! In-memory forwarding plane and netdev for tests and rootless runs.
//!
//! [`SimPlane`] models datapath state the way Open vSwitch would answer:
//! duplicate bridges are rejected, `delete_bridge` is idempotent, port
//! number requests are advisory. Every call is also recorded as the
//! exact command line the real backend would have run, so tests can
//! assert on dialect without a datapath present.

use std::collections::HashMap;
use tokio::sync::Mutex;

use async_trait::async_trait;
use mobinet_types::{ControllerEndpoint, PortNo};

use crate::commands;
use crate::error::{PlaneError, PlaneResult};
use crate::plane::{ForwardingPlane, NetDev, PlaneVersion};

/// Operations that can be targeted by fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimOp {
    CreateBridge,
    DeleteBridge,
    SetController,
    BindPort,
    UnbindPort,
    QueryPort,
    ClearFlows,
}

#[derive(Debug, Default)]
struct SimBridge {
    controller: Option<ControllerEndpoint>,
    ports: HashMap<String, PortNo>,
    next_auto: u32,
    flows_cleared: u32,
}

impl SimBridge {
    fn port_in_use(&self, no: PortNo) -> bool {
        self.ports.values().any(|&p| p == no)
    }

    /// Picks the lowest free port number, as the datapath does for
    /// plain attachments.
    fn auto_assign(&mut self) -> PortNo {
        let mut candidate = self.next_auto.max(1);
        loop {
            if let Ok(no) = PortNo::new(candidate) {
                if !self.port_in_use(no) {
                    self.next_auto = candidate + 1;
                    return no;
                }
            }
            candidate += 1;
        }
    }
}

#[derive(Debug)]
struct SimState {
    bridges: HashMap<String, SimBridge>,
    /// Forced assignments keyed by (bridge, interface); lets tests make
    /// the datapath answer a bind with a number other than the request.
    overrides: HashMap<(String, String), PortNo>,
    version: PlaneVersion,
    fail_next: Option<SimOp>,
    log: Vec<String>,
}

/// Simulated forwarding plane.
#[derive(Debug)]
pub struct SimPlane {
    state: Mutex<SimState>,
}

impl SimPlane {
    /// Creates a simulated datapath speaking the modern dialect.
    pub fn new() -> Self {
        Self::with_version(PlaneVersion::Modern)
    }

    /// Creates a simulated datapath speaking the given dialect.
    pub fn with_version(version: PlaneVersion) -> Self {
        Self {
            state: Mutex::new(SimState {
                bridges: HashMap::new(),
                overrides: HashMap::new(),
                version,
                fail_next: None,
                log: Vec::new(),
            }),
        }
    }

    /// Arms a one-shot failure for the next matching operation.
    pub async fn fail_next(&self, op: SimOp) {
        self.state.lock().await.fail_next = Some(op);
    }

    /// Forces the datapath to assign `actual` when `intf` is next bound
    /// on `bridge`, regardless of what the caller requests.
    pub async fn force_port(&self, bridge: &str, intf: &str, actual: PortNo) {
        self.state
            .lock()
            .await
            .overrides
            .insert((bridge.to_string(), intf.to_string()), actual);
    }

    /// Returns the command lines recorded so far.
    pub async fn log(&self) -> Vec<String> {
        self.state.lock().await.log.clone()
    }

    /// Returns true if the bridge exists.
    pub async fn has_bridge(&self, bridge: &str) -> bool {
        self.state.lock().await.bridges.contains_key(bridge)
    }

    /// Returns the controller currently set on the bridge.
    pub async fn controller_of(&self, bridge: &str) -> Option<ControllerEndpoint> {
        self.state
            .lock()
            .await
            .bridges
            .get(bridge)
            .and_then(|b| b.controller.clone())
    }

    /// Returns the port number assigned to an interface on the bridge.
    pub async fn port_of(&self, bridge: &str, intf: &str) -> Option<PortNo> {
        self.state
            .lock()
            .await
            .bridges
            .get(bridge)
            .and_then(|b| b.ports.get(intf).copied())
    }

    /// Returns how many times the bridge's flow table was flushed.
    pub async fn flows_cleared(&self, bridge: &str) -> u32 {
        self.state
            .lock()
            .await
            .bridges
            .get(bridge)
            .map(|b| b.flows_cleared)
            .unwrap_or(0)
    }
}

impl Default for SimPlane {
    fn default() -> Self {
        Self::new()
    }
}

fn take_injected_failure(state: &mut SimState, op: SimOp, command: String) -> PlaneResult<()> {
    if state.fail_next == Some(op) {
        state.fail_next = None;
        return Err(PlaneError::CommandFailed {
            command,
            exit_code: 1,
            output: "injected failure".to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl ForwardingPlane for SimPlane {
    async fn create_bridge(&self, bridge: &str) -> PlaneResult<()> {
        let mut state = self.state.lock().await;
        let cmd = commands::build_add_bridge_cmd(bridge);
        state.log.push(cmd.clone());
        take_injected_failure(&mut state, SimOp::CreateBridge, cmd)?;
        if state.bridges.contains_key(bridge) {
            return Err(PlaneError::already_exists("bridge", bridge));
        }
        state.bridges.insert(bridge.to_string(), SimBridge::default());
        Ok(())
    }

    async fn delete_bridge(&self, bridge: &str) -> PlaneResult<()> {
        let mut state = self.state.lock().await;
        let cmd = commands::build_del_bridge_cmd(bridge);
        state.log.push(cmd.clone());
        take_injected_failure(&mut state, SimOp::DeleteBridge, cmd)?;
        // --if-exists semantics: deleting a missing bridge is fine
        state.bridges.remove(bridge);
        Ok(())
    }

    async fn set_controller(&self, bridge: &str, target: &ControllerEndpoint) -> PlaneResult<()> {
        let mut state = self.state.lock().await;
        let cmd = commands::build_set_controller_cmd(bridge, &target.target());
        state.log.push(cmd.clone());
        take_injected_failure(&mut state, SimOp::SetController, cmd)?;
        let entry = state
            .bridges
            .get_mut(bridge)
            .ok_or_else(|| PlaneError::no_such("bridge", bridge))?;
        entry.controller = Some(target.clone());
        Ok(())
    }

    async fn bind_port(
        &self,
        bridge: &str,
        intf: &str,
        request: Option<PortNo>,
    ) -> PlaneResult<()> {
        let mut state = self.state.lock().await;
        let cmd = match request {
            Some(port) => commands::build_add_port_with_request_cmd(bridge, intf, port),
            None => commands::build_add_port_cmd(bridge, intf),
        };
        state.log.push(cmd.clone());
        take_injected_failure(&mut state, SimOp::BindPort, cmd)?;

        if state
            .bridges
            .values()
            .any(|b| b.ports.contains_key(intf))
        {
            return Err(PlaneError::already_exists("port", intf));
        }
        let version = state.version;
        let forced = state
            .overrides
            .remove(&(bridge.to_string(), intf.to_string()));
        let entry = state
            .bridges
            .get_mut(bridge)
            .ok_or_else(|| PlaneError::no_such("bridge", bridge))?;

        // The request is advisory: legacy datapaths ignore it outright,
        // and any datapath falls back to auto-assignment on collision.
        let assigned = match forced {
            Some(actual) => actual,
            None => match request {
                Some(no) if version.supports_port_request() && !entry.port_in_use(no) => no,
                _ => entry.auto_assign(),
            },
        };
        entry.ports.insert(intf.to_string(), assigned);
        Ok(())
    }

    async fn unbind_port(&self, bridge: &str, intf: &str) -> PlaneResult<()> {
        let mut state = self.state.lock().await;
        let cmd = commands::build_del_port_cmd(bridge, intf);
        state.log.push(cmd.clone());
        take_injected_failure(&mut state, SimOp::UnbindPort, cmd)?;
        let entry = state
            .bridges
            .get_mut(bridge)
            .ok_or_else(|| PlaneError::no_such("bridge", bridge))?;
        entry
            .ports
            .remove(intf)
            .ok_or_else(|| PlaneError::no_such("port", intf))?;
        Ok(())
    }

    async fn query_port(&self, intf: &str) -> PlaneResult<PortNo> {
        let mut state = self.state.lock().await;
        let cmd = commands::build_get_ofport_cmd(intf);
        state.log.push(cmd.clone());
        take_injected_failure(&mut state, SimOp::QueryPort, cmd)?;
        state
            .bridges
            .values()
            .find_map(|b| b.ports.get(intf).copied())
            .ok_or_else(|| PlaneError::no_such("interface", intf))
    }

    async fn clear_flows(&self, bridge: &str) -> PlaneResult<()> {
        let mut state = self.state.lock().await;
        let cmd = commands::build_clear_flows_cmd(bridge);
        state.log.push(cmd.clone());
        take_injected_failure(&mut state, SimOp::ClearFlows, cmd)?;
        let entry = state
            .bridges
            .get_mut(bridge)
            .ok_or_else(|| PlaneError::no_such("bridge", bridge))?;
        entry.flows_cleared += 1;
        Ok(())
    }

    async fn version(&self) -> PlaneResult<PlaneVersion> {
        Ok(self.state.lock().await.version)
    }
}

#[derive(Debug, Clone)]
struct SimLink {
    up: bool,
    peer: Option<String>,
}

#[derive(Debug, Default)]
struct NetState {
    devices: HashMap<String, SimLink>,
    log: Vec<String>,
}

/// Simulated kernel link table.
///
/// Enforces the constraint the kernel does: a link must be down before
/// it can be renamed.
#[derive(Debug, Default)]
pub struct SimNetDev {
    state: Mutex<NetState>,
}

impl SimNetDev {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the link exists.
    pub async fn exists(&self, dev: &str) -> bool {
        self.state.lock().await.devices.contains_key(dev)
    }

    /// Returns true if the link exists and is up.
    pub async fn is_up(&self, dev: &str) -> bool {
        self.state
            .lock()
            .await
            .devices
            .get(dev)
            .map(|l| l.up)
            .unwrap_or(false)
    }

    /// Returns the command lines recorded so far.
    pub async fn log(&self) -> Vec<String> {
        self.state.lock().await.log.clone()
    }
}

#[async_trait]
impl NetDev for SimNetDev {
    async fn link_up(&self, dev: &str) -> PlaneResult<()> {
        let mut state = self.state.lock().await;
        state.log.push(commands::build_link_up_cmd(dev));
        let link = state
            .devices
            .get_mut(dev)
            .ok_or_else(|| PlaneError::no_such("link", dev))?;
        link.up = true;
        Ok(())
    }

    async fn link_down(&self, dev: &str) -> PlaneResult<()> {
        let mut state = self.state.lock().await;
        state.log.push(commands::build_link_down_cmd(dev));
        let link = state
            .devices
            .get_mut(dev)
            .ok_or_else(|| PlaneError::no_such("link", dev))?;
        link.up = false;
        Ok(())
    }

    async fn rename(&self, old: &str, new: &str) -> PlaneResult<()> {
        let mut state = self.state.lock().await;
        let cmd = commands::build_link_rename_cmd(old, new);
        state.log.push(cmd.clone());
        let Some(link) = state.devices.get(old).cloned() else {
            return Err(PlaneError::no_such("link", old));
        };
        if link.up {
            return Err(PlaneError::CommandFailed {
                command: cmd,
                exit_code: 2,
                output: "RTNETLINK answers: Device or resource busy".to_string(),
            });
        }
        if state.devices.contains_key(new) {
            return Err(PlaneError::CommandFailed {
                command: cmd,
                exit_code: 2,
                output: "RTNETLINK answers: File exists".to_string(),
            });
        }
        state.devices.remove(old);
        if let Some(peer_name) = &link.peer {
            if let Some(peer) = state.devices.get_mut(peer_name) {
                peer.peer = Some(new.to_string());
            }
        }
        state.devices.insert(new.to_string(), link);
        Ok(())
    }

    async fn create_veth_pair(&self, a: &str, b: &str) -> PlaneResult<()> {
        let mut state = self.state.lock().await;
        state.log.push(commands::build_veth_add_cmd(a, b));
        if state.devices.contains_key(a) {
            return Err(PlaneError::already_exists("link", a));
        }
        if state.devices.contains_key(b) {
            return Err(PlaneError::already_exists("link", b));
        }
        state.devices.insert(
            a.to_string(),
            SimLink {
                up: false,
                peer: Some(b.to_string()),
            },
        );
        state.devices.insert(
            b.to_string(),
            SimLink {
                up: false,
                peer: Some(a.to_string()),
            },
        );
        Ok(())
    }

    async fn delete_link(&self, dev: &str) -> PlaneResult<()> {
        let mut state = self.state.lock().await;
        state.log.push(commands::build_link_del_cmd(dev));
        let link = state
            .devices
            .remove(dev)
            .ok_or_else(|| PlaneError::no_such("link", dev))?;
        if let Some(peer) = link.peer {
            state.devices.remove(&peer);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(host: &str, port: u16) -> ControllerEndpoint {
        ControllerEndpoint::new(host, port).unwrap()
    }

    #[tokio::test]
    async fn test_create_bridge_rejects_duplicate() {
        let plane = SimPlane::new();
        plane.create_bridge("s1").await.unwrap();
        let result = plane.create_bridge("s1").await;
        assert!(matches!(
            result,
            Err(PlaneError::AlreadyExists { kind: "bridge", .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_bridge_is_idempotent() {
        let plane = SimPlane::new();
        plane.delete_bridge("never-created").await.unwrap();
        plane.create_bridge("s1").await.unwrap();
        plane.delete_bridge("s1").await.unwrap();
        plane.delete_bridge("s1").await.unwrap();
        assert!(!plane.has_bridge("s1").await);
    }

    #[tokio::test]
    async fn test_set_controller() {
        let plane = SimPlane::new();
        plane.create_bridge("s1").await.unwrap();
        let c0 = endpoint("127.0.0.1", 6653);
        plane.set_controller("s1", &c0).await.unwrap();
        assert_eq!(plane.controller_of("s1").await, Some(c0));
    }

    #[tokio::test]
    async fn test_bind_honors_request_on_modern() {
        let plane = SimPlane::new();
        plane.create_bridge("s1").await.unwrap();
        let want = PortNo::new(7).unwrap();
        plane.bind_port("s1", "s1-eth7", Some(want)).await.unwrap();
        assert_eq!(plane.port_of("s1", "s1-eth7").await, Some(want));
        assert_eq!(plane.query_port("s1-eth7").await.unwrap(), want);
    }

    #[tokio::test]
    async fn test_bind_ignores_request_on_legacy() {
        let plane = SimPlane::with_version(PlaneVersion::Legacy);
        plane.create_bridge("s1").await.unwrap();
        let want = PortNo::new(9).unwrap();
        plane.bind_port("s1", "s1-eth9", Some(want)).await.unwrap();
        // Legacy datapaths auto-assign from 1 regardless of the request
        assert_eq!(
            plane.port_of("s1", "s1-eth9").await,
            Some(PortNo::new(1).unwrap())
        );
    }

    #[tokio::test]
    async fn test_bind_auto_assigns_without_request() {
        let plane = SimPlane::new();
        plane.create_bridge("s1").await.unwrap();
        plane.bind_port("s1", "s1-eth1", None).await.unwrap();
        plane.bind_port("s1", "s1-eth2", None).await.unwrap();
        assert_eq!(
            plane.port_of("s1", "s1-eth1").await,
            Some(PortNo::new(1).unwrap())
        );
        assert_eq!(
            plane.port_of("s1", "s1-eth2").await,
            Some(PortNo::new(2).unwrap())
        );
    }

    #[tokio::test]
    async fn test_bind_falls_back_on_collision() {
        let plane = SimPlane::new();
        plane.create_bridge("s1").await.unwrap();
        let want = PortNo::new(3).unwrap();
        plane.bind_port("s1", "s1-eth3", Some(want)).await.unwrap();
        plane.bind_port("s1", "s1-ethx", Some(want)).await.unwrap();
        let got = plane.port_of("s1", "s1-ethx").await.unwrap();
        assert_ne!(got, want);
    }

    #[tokio::test]
    async fn test_force_port_overrides_request() {
        let plane = SimPlane::new();
        plane.create_bridge("s1").await.unwrap();
        let forced = PortNo::new(42).unwrap();
        plane.force_port("s1", "s1-eth5", forced).await;
        plane
            .bind_port("s1", "s1-eth5", Some(PortNo::new(5).unwrap()))
            .await
            .unwrap();
        assert_eq!(plane.port_of("s1", "s1-eth5").await, Some(forced));
    }

    #[tokio::test]
    async fn test_unbind_then_query_fails() {
        let plane = SimPlane::new();
        plane.create_bridge("s1").await.unwrap();
        plane.bind_port("s1", "s1-eth1", None).await.unwrap();
        plane.unbind_port("s1", "s1-eth1").await.unwrap();
        assert!(plane.query_port("s1-eth1").await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_port_rejected_across_bridges() {
        let plane = SimPlane::new();
        plane.create_bridge("s1").await.unwrap();
        plane.create_bridge("s2").await.unwrap();
        plane.bind_port("s1", "shared", None).await.unwrap();
        let result = plane.bind_port("s2", "shared", None).await;
        assert!(matches!(
            result,
            Err(PlaneError::AlreadyExists { kind: "port", .. })
        ));
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let plane = SimPlane::new();
        plane.create_bridge("s1").await.unwrap();
        plane.fail_next(SimOp::ClearFlows).await;
        assert!(plane.clear_flows("s1").await.is_err());
        assert!(plane.clear_flows("s1").await.is_ok());
        assert_eq!(plane.flows_cleared("s1").await, 1);
    }

    #[tokio::test]
    async fn test_log_records_dialect() {
        let plane = SimPlane::new();
        plane.create_bridge("s1").await.unwrap();
        plane
            .bind_port("s1", "s1-eth2", Some(PortNo::new(2).unwrap()))
            .await
            .unwrap();
        plane.bind_port("s1", "s1-eth3", None).await.unwrap();
        let log = plane.log().await;
        assert!(log[1].contains("ofport_request=2"));
        assert!(!log[2].contains("ofport_request"));
    }

    #[tokio::test]
    async fn test_netdev_rename_requires_down() {
        let dev = SimNetDev::new();
        dev.create_veth_pair("h1-eth0", "s1-eth1").await.unwrap();
        dev.link_up("s1-eth1").await.unwrap();
        let result = dev.rename("s1-eth1", "s2-eth7").await;
        assert!(matches!(result, Err(PlaneError::CommandFailed { .. })));

        dev.link_down("s1-eth1").await.unwrap();
        dev.rename("s1-eth1", "s2-eth7").await.unwrap();
        assert!(dev.exists("s2-eth7").await);
        assert!(!dev.exists("s1-eth1").await);
    }

    #[tokio::test]
    async fn test_netdev_rename_rejects_collision() {
        let dev = SimNetDev::new();
        dev.create_veth_pair("a", "b").await.unwrap();
        let result = dev.rename("a", "b").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_netdev_delete_removes_peer() {
        let dev = SimNetDev::new();
        dev.create_veth_pair("h1-eth0", "s1-eth1").await.unwrap();
        dev.delete_link("h1-eth0").await.unwrap();
        assert!(!dev.exists("s1-eth1").await);
    }
}
