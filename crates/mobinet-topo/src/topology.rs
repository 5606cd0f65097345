//! Topology arena: switches, hosts, and the cables between them.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use mobinet_plane::{ForwardingPlane, NetDev};
use mobinet_types::{ifname, ControllerEndpoint, PortNo};

use crate::affinity::ControllerSelectionPolicy;
use crate::error::{TopoError, TopoResult};
use crate::host::Host;
use crate::intf::{Interface, IntfId};
use crate::link::{Link, LinkId};
use crate::switch::VirtualSwitch;

/// The full emulated network.
///
/// Owns every switch, host, and link. Nodes are kept in insertion
/// order, which is also report order. All datapath and kernel handles
/// are shared into the switches at construction, so a topology is
/// wholly backed by one plane (real or simulated).
pub struct Topology {
    plane: Arc<dyn ForwardingPlane>,
    netdev: Arc<dyn NetDev>,
    policy: Arc<dyn ControllerSelectionPolicy>,

    switches: Vec<VirtualSwitch>,
    switch_index: HashMap<String, usize>,
    hosts: Vec<Host>,
    host_index: HashMap<String, usize>,
    links: HashMap<LinkId, Link>,

    next_intf: u64,
    next_link: u64,
}

impl Topology {
    pub fn new(
        plane: Arc<dyn ForwardingPlane>,
        netdev: Arc<dyn NetDev>,
        policy: Arc<dyn ControllerSelectionPolicy>,
    ) -> Self {
        Self {
            plane,
            netdev,
            policy,
            switches: Vec::new(),
            switch_index: HashMap::new(),
            hosts: Vec::new(),
            host_index: HashMap::new(),
            links: HashMap::new(),
            next_intf: 1,
            next_link: 1,
        }
    }

    /// Handle to the kernel link client switches share.
    pub fn netdev(&self) -> &Arc<dyn NetDev> {
        &self.netdev
    }

    /// Adds a switch. Names are global across switches and hosts.
    pub fn add_switch(&mut self, name: impl Into<String>) -> TopoResult<()> {
        let name = name.into();
        if self.switch_index.contains_key(&name) || self.host_index.contains_key(&name) {
            return Err(TopoError::duplicate_node(name));
        }
        let switch = VirtualSwitch::new(
            name.clone(),
            self.plane.clone(),
            self.netdev.clone(),
            self.policy.clone(),
        );
        self.switch_index.insert(name, self.switches.len());
        self.switches.push(switch);
        Ok(())
    }

    /// Adds a host.
    pub fn add_host(&mut self, name: impl Into<String>) -> TopoResult<()> {
        let name = name.into();
        if self.switch_index.contains_key(&name) || self.host_index.contains_key(&name) {
            return Err(TopoError::duplicate_node(name));
        }
        self.host_index.insert(name.clone(), self.hosts.len());
        self.hosts.push(Host::new(name));
        Ok(())
    }

    /// Cables two nodes together.
    ///
    /// Each side gets the next free port on its node (hosts count from
    /// 0, switches from 1) and a canonically named veth end; the pair
    /// is created down and brought up on both sides. Interfaces on
    /// switches are registered only — binding into the datapath happens
    /// at switch start.
    pub async fn add_link(&mut self, a: &str, b: &str) -> TopoResult<LinkId> {
        let port_a = self.next_port(a)?;
        let name_a = ifname::canonical(a, port_a);
        let port_b = self.next_port(b)?;
        let name_b = ifname::canonical(b, port_b);

        self.netdev.create_veth_pair(&name_a, &name_b).await?;
        self.netdev.link_up(&name_a).await?;
        self.netdev.link_up(&name_b).await?;

        let link_id = LinkId::new(self.next_link);
        self.next_link += 1;

        let id_a = self.alloc_intf_id();
        let id_b = self.alloc_intf_id();
        let mut intf_a = Interface::new(id_a, &name_a, port_a);
        intf_a.set_link(link_id);
        let mut intf_b = Interface::new(id_b, &name_b, port_b);
        intf_b.set_link(link_id);

        self.place_interface(a, intf_a, port_a).await?;
        self.place_interface(b, intf_b, port_b).await?;
        self.links.insert(link_id, Link::new(id_a, id_b));

        debug!(link = %link_id, a = %name_a, b = %name_b, "Link created");
        Ok(link_id)
    }

    /// Starts every switch, in insertion order.
    ///
    /// `candidates` is forwarded to each switch's selection policy; the
    /// default affinity policy ignores it.
    pub async fn start_all(&mut self, candidates: &[ControllerEndpoint]) -> TopoResult<()> {
        info!(switches = self.switches.len(), "Starting topology");
        for switch in &mut self.switches {
            switch.start(candidates).await?;
        }
        Ok(())
    }

    /// Flushes the flow tables of every switch.
    pub async fn clear_all_flows(&self) -> TopoResult<()> {
        for switch in &self.switches {
            switch.clear_flows().await?;
        }
        Ok(())
    }

    /// Stops every switch, tearing down their bridges.
    pub async fn stop_all(&mut self) -> TopoResult<()> {
        for switch in &mut self.switches {
            switch.stop().await?;
        }
        Ok(())
    }

    /// Full teardown: stops all switches, then deletes the veth pairs.
    ///
    /// Link deletion is best effort; a missing device is logged and
    /// skipped so teardown always runs to the end.
    pub async fn teardown(&mut self) -> TopoResult<()> {
        self.stop_all().await?;
        let ends: Vec<String> = self
            .links
            .values()
            .filter_map(|link| {
                let (a, _) = link.endpoints();
                self.interface_location(a).map(|(_, intf)| intf.name().to_string())
            })
            .collect();
        for dev in ends {
            if let Err(err) = self.netdev.delete_link(&dev).await {
                warn!(dev = %dev, error = %err, "Failed to delete link during teardown");
            }
        }
        info!("Topology torn down");
        Ok(())
    }

    pub fn switch(&self, name: &str) -> Option<&VirtualSwitch> {
        self.switch_index.get(name).map(|&i| &self.switches[i])
    }

    pub fn switch_mut(&mut self, name: &str) -> Option<&mut VirtualSwitch> {
        let idx = *self.switch_index.get(name)?;
        Some(&mut self.switches[idx])
    }

    /// Like [`switch`](Self::switch) but failing with `UnknownNode`.
    pub fn require_switch(&self, name: &str) -> TopoResult<&VirtualSwitch> {
        self.switch(name)
            .ok_or_else(|| TopoError::unknown_node(name))
    }

    /// Like [`switch_mut`](Self::switch_mut) but failing with `UnknownNode`.
    pub fn require_switch_mut(&mut self, name: &str) -> TopoResult<&mut VirtualSwitch> {
        self.switch_mut(name)
            .ok_or_else(|| TopoError::unknown_node(name))
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.host_index.get(name).map(|&i| &self.hosts[i])
    }

    pub fn require_host(&self, name: &str) -> TopoResult<&Host> {
        self.host(name).ok_or_else(|| TopoError::unknown_node(name))
    }

    /// Switches in insertion order.
    pub fn switches(&self) -> impl Iterator<Item = &VirtualSwitch> {
        self.switches.iter()
    }

    /// Hosts in insertion order.
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Finds which node currently owns an interface.
    pub fn interface_location(&self, id: IntfId) -> Option<(&str, &Interface)> {
        for switch in &self.switches {
            if let Some(intf) = switch.interface_by_id(id) {
                return Some((switch.name(), intf));
            }
        }
        for host in &self.hosts {
            if let Some(intf) = host.interface_by_id(id) {
                return Some((host.name(), intf));
            }
        }
        None
    }

    /// Resolves the interface pair connecting `host` to `switch`.
    ///
    /// Returns `(host-side name, switch-side name)` for the first such
    /// pair in host port order. Fails with `HostNotConnected` when the
    /// host has no link ending on that switch.
    pub fn connection_between(&self, host: &str, switch: &str) -> TopoResult<(String, String)> {
        let host_node = self.require_host(host)?;
        let switch_node = self.require_switch(switch)?;

        for intf in host_node.interfaces() {
            let Some(link_id) = intf.link() else {
                continue;
            };
            let Some(link) = self.links.get(&link_id) else {
                continue;
            };
            let Some(peer_id) = link.peer_of(intf.id()) else {
                continue;
            };
            if let Some(peer) = switch_node.interface_by_id(peer_id) {
                return Ok((intf.name().to_string(), peer.name().to_string()));
            }
        }
        Err(TopoError::host_not_connected(host, switch))
    }

    fn alloc_intf_id(&mut self) -> IntfId {
        let id = IntfId::new(self.next_intf);
        self.next_intf += 1;
        id
    }

    /// Next free port on a node: hosts count from 0, switches from 1.
    pub(crate) fn next_port(&self, node: &str) -> TopoResult<PortNo> {
        if let Some(switch) = self.switch(node) {
            let next = switch
                .interfaces()
                .map(Interface::port)
                .max()
                .map(|p| p.next())
                .unwrap_or(PortNo::BASE.next());
            return Ok(next);
        }
        if let Some(host) = self.host(node) {
            let next = host
                .interfaces()
                .map(Interface::port)
                .max()
                .map(|p| p.next())
                .unwrap_or(PortNo::BASE);
            return Ok(next);
        }
        Err(TopoError::unknown_node(node))
    }

    async fn place_interface(
        &mut self,
        node: &str,
        intf: Interface,
        port: PortNo,
    ) -> TopoResult<()> {
        if let Some(idx) = self.switch_index.get(node).copied() {
            self.switches[idx].add_interface(intf, port, false).await?;
            return Ok(());
        }
        if let Some(idx) = self.host_index.get(node).copied() {
            self.hosts[idx].add_interface(intf, port)?;
            return Ok(());
        }
        Err(TopoError::unknown_node(node))
    }
}
