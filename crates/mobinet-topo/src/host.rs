//! Emulated end hosts.
//!
//! Hosts are passive: they own their interfaces but never talk to the
//! forwarding plane. A host's attachment moves between switches by
//! migrating the switch-side interface, so the host itself is
//! untouched by mobility.

use std::collections::BTreeMap;

use mobinet_types::PortNo;

use crate::error::{TopoError, TopoResult};
use crate::intf::{Interface, IntfId};

/// An end host with numbered interfaces, the first at port 0.
pub struct Host {
    name: String,
    interfaces: BTreeMap<PortNo, Interface>,
}

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers an interface, taking ownership.
    pub fn add_interface(&mut self, mut intf: Interface, port: PortNo) -> TopoResult<()> {
        if self.interfaces.contains_key(&port) {
            return Err(TopoError::port_collision(&self.name, port));
        }
        intf.set_port(port);
        self.interfaces.insert(port, intf);
        Ok(())
    }

    /// Interfaces in port order.
    pub fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.values()
    }

    pub fn interface(&self, port: PortNo) -> Option<&Interface> {
        self.interfaces.get(&port)
    }

    pub fn interface_named(&self, name: &str) -> Option<&Interface> {
        self.interfaces.values().find(|intf| intf.name() == name)
    }

    pub fn interface_by_id(&self, id: IntfId) -> Option<&Interface> {
        self.interfaces.values().find(|intf| intf.id() == id)
    }

    /// Lowest-numbered interface, conventionally the host's uplink.
    pub fn default_interface(&self) -> Option<&Interface> {
        self.interfaces.values().next()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
