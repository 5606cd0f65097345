//! Forwarding-plane and network-device abstractions.
//!
//! Topology code never shells out directly; it talks to these traits.
//! [`crate::OvsPlane`] and [`crate::IpNetDev`] are the real backends,
//! [`crate::SimPlane`] and [`crate::SimNetDev`] the in-memory ones.

use async_trait::async_trait;
use mobinet_types::{ControllerEndpoint, PortNo};

use crate::error::PlaneResult;

/// Command dialect spoken by the datapath.
///
/// Releases before 1.10 ignore `ofport_request`, so port attachments on
/// them cannot ask for a specific OpenFlow port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneVersion {
    /// Pre-1.10 release; plain port attachment only.
    Legacy,
    /// 1.10 or newer; honors `ofport_request`.
    Modern,
}

impl PlaneVersion {
    /// Classifies a datapath release by major/minor version.
    pub fn from_release(major: u32, minor: u32) -> Self {
        if major < 1 || (major == 1 && minor < 10) {
            Self::Legacy
        } else {
            Self::Modern
        }
    }

    /// Returns true if port attachments may request a specific port number.
    pub fn supports_port_request(&self) -> bool {
        matches!(self, Self::Modern)
    }
}

/// Datapath-facing operations for a virtual switch.
///
/// Implementations are shared across switches, so every method takes
/// `&self` and the bridge name explicitly.
#[async_trait]
pub trait ForwardingPlane: Send + Sync {
    /// Creates the bridge backing a switch.
    async fn create_bridge(&self, bridge: &str) -> PlaneResult<()>;

    /// Deletes the bridge backing a switch. Succeeds if it never existed.
    async fn delete_bridge(&self, bridge: &str) -> PlaneResult<()>;

    /// Points the bridge at its controller.
    async fn set_controller(&self, bridge: &str, target: &ControllerEndpoint) -> PlaneResult<()>;

    /// Attaches an interface to the bridge.
    ///
    /// With `request = Some(port)` the datapath is asked to assign that
    /// OpenFlow port number; the request is advisory and the datapath
    /// may answer with a different number. `None` lets the datapath
    /// pick freely (the only option on [`PlaneVersion::Legacy`]).
    async fn bind_port(
        &self,
        bridge: &str,
        intf: &str,
        request: Option<PortNo>,
    ) -> PlaneResult<()>;

    /// Detaches an interface from the bridge.
    async fn unbind_port(&self, bridge: &str, intf: &str) -> PlaneResult<()>;

    /// Reports the OpenFlow port number the datapath actually assigned.
    async fn query_port(&self, intf: &str) -> PlaneResult<PortNo>;

    /// Flushes every flow entry on the bridge.
    async fn clear_flows(&self, bridge: &str) -> PlaneResult<()>;

    /// Reports the command dialect the datapath speaks.
    async fn version(&self) -> PlaneResult<PlaneVersion>;
}

/// Kernel-level link operations.
#[async_trait]
pub trait NetDev: Send + Sync {
    /// Brings a link administratively up.
    async fn link_up(&self, dev: &str) -> PlaneResult<()>;

    /// Brings a link administratively down.
    async fn link_down(&self, dev: &str) -> PlaneResult<()>;

    /// Renames a link. The link must be down.
    async fn rename(&self, old: &str, new: &str) -> PlaneResult<()>;

    /// Creates a veth pair; both ends start down.
    async fn create_veth_pair(&self, a: &str, b: &str) -> PlaneResult<()>;

    /// Deletes a link (and, for veth, its peer).
    async fn delete_link(&self, dev: &str) -> PlaneResult<()>;
}
