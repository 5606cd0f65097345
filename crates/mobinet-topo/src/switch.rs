//! VirtualSwitch - interface registry and datapath binding.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use mobinet_plane::{ForwardingPlane, NetDev, PlaneVersion};
use mobinet_types::{ifname, ControllerEndpoint, PortNo};

use crate::affinity::ControllerSelectionPolicy;
use crate::error::{TopoError, TopoResult};
use crate::intf::{Interface, IntfId};

/// Outcome of checking the datapath's port assignment against the
/// registry.
///
/// A disagreement is a warning, never an error: the registry keeps the
/// requested value and the datapath keeps its own, and callers that
/// care can look at both sides here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortValidation {
    /// Port recorded in the switch registry.
    pub requested: PortNo,
    /// Port the forwarding plane reports.
    pub actual: PortNo,
}

impl PortValidation {
    /// Returns true if the datapath agreed with the request.
    pub fn matched(&self) -> bool {
        self.requested == self.actual
    }
}

/// An emulated switch: a live registry of interfaces plus the handles
/// needed to mirror that registry into a forwarding plane.
///
/// Interfaces are held by value, indexed by port number and by name.
/// Holding them by value is what makes ownership exclusive: an
/// interface can only move to another switch by being removed from
/// this registry first.
pub struct VirtualSwitch {
    /// Switch name, doubling as the bridge name on the datapath.
    name: String,

    /// Datapath client, shared across switches.
    plane: Arc<dyn ForwardingPlane>,

    /// Kernel link client, shared across switches.
    netdev: Arc<dyn NetDev>,

    /// Decides which controller `start` binds to.
    policy: Arc<dyn ControllerSelectionPolicy>,

    /// Port index. BTreeMap so enumeration is in port order.
    ports: BTreeMap<PortNo, Interface>,

    /// Name index into `ports`.
    names: HashMap<String, PortNo>,

    /// Controller bound at start; `None` until then.
    controller: Option<ControllerEndpoint>,

    /// Datapath dialect, probed once per switch on first attach.
    dialect: Option<PlaneVersion>,
}

impl VirtualSwitch {
    pub fn new(
        name: impl Into<String>,
        plane: Arc<dyn ForwardingPlane>,
        netdev: Arc<dyn NetDev>,
        policy: Arc<dyn ControllerSelectionPolicy>,
    ) -> Self {
        Self {
            name: name.into(),
            plane,
            netdev,
            policy,
            ports: BTreeMap::new(),
            names: HashMap::new(),
            controller: None,
            dialect: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The controller bound at start, if the switch has started.
    pub fn controller(&self) -> Option<&ControllerEndpoint> {
        self.controller.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.controller.is_some()
    }

    /// Interfaces in port order.
    pub fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.ports.values()
    }

    pub fn interface(&self, port: PortNo) -> Option<&Interface> {
        self.ports.get(&port)
    }

    pub fn interface_named(&self, name: &str) -> Option<&Interface> {
        self.names.get(name).and_then(|port| self.ports.get(port))
    }

    pub fn interface_by_id(&self, id: IntfId) -> Option<&Interface> {
        self.ports.values().find(|intf| intf.id() == id)
    }

    pub fn contains_port(&self, port: PortNo) -> bool {
        self.ports.contains_key(&port)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Starts the switch: resolves its controller through the selection
    /// policy, creates the backing bridge, binds every registered
    /// interface, and opens the control channel.
    ///
    /// The policy is consulted exactly once per switch lifecycle. The
    /// default policy resolves through the affinity map and ignores
    /// `candidates` entirely.
    #[instrument(skip(self, candidates), fields(switch = %self.name))]
    pub async fn start(&mut self, candidates: &[ControllerEndpoint]) -> TopoResult<()> {
        if self.controller.is_some() {
            return Err(TopoError::AlreadyStarted {
                switch: self.name.clone(),
            });
        }
        let endpoint = self.policy.select(&self.name, candidates)?;

        self.plane.create_bridge(&self.name).await?;
        let registered: Vec<String> = self.ports.values().map(|i| i.name().to_string()).collect();
        for intf in &registered {
            self.attach(intf).await?;
            self.validate_port(intf).await?;
        }
        self.plane.set_controller(&self.name, &endpoint).await?;

        info!(switch = %self.name, controller = %endpoint, "Switch started");
        self.controller = Some(endpoint);
        Ok(())
    }

    /// Stops the switch, tearing down its bridge.
    pub async fn stop(&mut self) -> TopoResult<()> {
        self.plane.delete_bridge(&self.name).await?;
        self.controller = None;
        debug!(switch = %self.name, "Switch stopped");
        Ok(())
    }

    /// Flushes the switch's flow table.
    pub async fn clear_flows(&self) -> TopoResult<()> {
        self.plane.clear_flows(&self.name).await?;
        Ok(())
    }

    /// Registers an interface under `requested` and under its current
    /// name, taking ownership.
    ///
    /// Fails with `PortCollision` if the port is occupied, leaving the
    /// registry untouched. With `rename` set, the interface is renamed
    /// to canonical form right after registration; the (possibly new)
    /// name is returned either way.
    ///
    /// Registration is bookkeeping only; the datapath is not told until
    /// [`attach`](Self::attach).
    #[instrument(skip(self, intf), fields(switch = %self.name, port = %requested))]
    pub async fn add_interface(
        &mut self,
        mut intf: Interface,
        requested: PortNo,
        rename: bool,
    ) -> TopoResult<String> {
        if self.ports.contains_key(&requested) {
            return Err(TopoError::port_collision(&self.name, requested));
        }
        intf.set_port(requested);
        let name = intf.name().to_string();
        self.names.insert(name.clone(), requested);
        self.ports.insert(requested, intf);
        debug!(switch = %self.name, intf = %name, port = %requested, "Interface registered");

        if rename {
            self.rename_interface(&name, None).await
        } else {
            Ok(name)
        }
    }

    /// Unregisters an interface from both indices and returns it.
    ///
    /// Removing an interface that was never attached is a programming
    /// error, reported as `InterfaceNotFound`.
    pub fn del_interface(&mut self, name: &str) -> TopoResult<Interface> {
        let port = *self
            .names
            .get(name)
            .ok_or_else(|| TopoError::interface_not_found(&self.name, name))?;
        let intf = self
            .ports
            .remove(&port)
            .ok_or_else(|| TopoError::interface_not_found(&self.name, name))?;
        self.names.remove(name);
        debug!(switch = %self.name, intf = %name, port = %port, "Interface unregistered");
        Ok(intf)
    }

    /// Binds a registered interface into the forwarding plane.
    ///
    /// The command dialect depends on the datapath version, probed once
    /// per switch: modern datapaths are asked for the registered port
    /// number, legacy ones get a plain attachment and assign their own.
    pub async fn attach(&mut self, name: &str) -> TopoResult<()> {
        let port = *self
            .names
            .get(name)
            .ok_or_else(|| TopoError::interface_not_found(&self.name, name))?;
        let dialect = self.dialect().await?;
        let request = dialect.supports_port_request().then_some(port);
        self.plane.bind_port(&self.name, name, request).await?;
        Ok(())
    }

    /// Unbinds an interface's live binding from the forwarding plane.
    ///
    /// Registry bookkeeping is untouched; pair with
    /// [`del_interface`](Self::del_interface) to fully remove it.
    pub async fn detach(&self, name: &str) -> TopoResult<()> {
        if !self.names.contains_key(name) {
            return Err(TopoError::interface_not_found(&self.name, name));
        }
        self.plane.unbind_port(&self.name, name).await?;
        Ok(())
    }

    /// Compares the datapath's actual port assignment with the registry.
    ///
    /// A mismatch is logged as a warning and returned for inspection;
    /// the registry deliberately keeps the requested value.
    pub async fn validate_port(&self, name: &str) -> TopoResult<PortValidation> {
        let requested = *self
            .names
            .get(name)
            .ok_or_else(|| TopoError::interface_not_found(&self.name, name))?;
        let actual = self.plane.query_port(name).await?;
        if actual != requested {
            warn!(
                switch = %self.name,
                intf = %name,
                requested = %requested,
                actual = %actual,
                "Forwarding plane assigned a different port; registry keeps the requested value"
            );
        }
        Ok(PortValidation { requested, actual })
    }

    /// Renames a registered interface, canonically or to an explicit
    /// override.
    ///
    /// The link goes down before the rename and comes back up after, so
    /// the datapath never holds a live binding under a stale name. With
    /// `new_name = None` the canonical `"<switch>-eth<port>"` form is
    /// used. Returns the final name.
    #[instrument(skip(self), fields(switch = %self.name, intf = %name))]
    pub async fn rename_interface(
        &mut self,
        name: &str,
        new_name: Option<&str>,
    ) -> TopoResult<String> {
        let port = *self
            .names
            .get(name)
            .ok_or_else(|| TopoError::interface_not_found(&self.name, name))?;
        let target = match new_name {
            Some(explicit) => explicit.to_string(),
            None => ifname::canonical(&self.name, port),
        };
        // The kernel rejects renaming a device to its current name
        if target == name {
            return Ok(target);
        }

        self.netdev.link_down(name).await?;
        self.netdev.rename(name, &target).await?;
        self.netdev.link_up(&target).await?;

        self.names.remove(name);
        self.names.insert(target.clone(), port);
        if let Some(intf) = self.ports.get_mut(&port) {
            intf.set_name(&target);
        }
        info!(switch = %self.name, from = %name, to = %target, "Interface renamed");
        Ok(target)
    }

    async fn dialect(&mut self) -> TopoResult<PlaneVersion> {
        if let Some(version) = self.dialect {
            return Ok(version);
        }
        let version = self.plane.version().await?;
        debug!(switch = %self.name, dialect = ?version, "Probed datapath dialect");
        self.dialect = Some(version);
        Ok(version)
    }
}
