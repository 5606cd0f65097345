//! Interface identity and bookkeeping.

use serde::Serialize;
use std::fmt;

use mobinet_types::PortNo;

use crate::link::LinkId;

/// Stable identity of an interface, independent of its name or owner.
///
/// Names change on migration (canonical renaming) and ownership moves
/// between switches; the id is what links refer to, so a link survives
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IntfId(u64);

impl IntfId {
    pub const fn new(raw: u64) -> Self {
        IntfId(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for IntfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "intf#{}", self.0)
    }
}

/// An attachment point owned by exactly one node at a time.
///
/// Ownership is expressed structurally: the owning node's registry
/// holds the `Interface` by value, so it cannot appear in two
/// registries at once. Moving an interface means removing the value
/// from one registry and inserting it into another.
#[derive(Debug, Clone, Serialize)]
pub struct Interface {
    id: IntfId,
    name: String,
    port: PortNo,
    link: Option<LinkId>,
}

impl Interface {
    /// Creates an unlinked interface.
    pub fn new(id: IntfId, name: impl Into<String>, port: PortNo) -> Self {
        Self {
            id,
            name: name.into(),
            port,
            link: None,
        }
    }

    pub fn id(&self) -> IntfId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port number recorded in the owning node's registry.
    pub fn port(&self) -> PortNo {
        self.port
    }

    pub fn link(&self) -> Option<LinkId> {
        self.link
    }

    /// Points the interface at its link. Set once at build time.
    pub fn set_link(&mut self, link: LinkId) {
        self.link = Some(link);
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn set_port(&mut self, port: PortNo) {
        self.port = port;
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_accessors() {
        let mut intf = Interface::new(IntfId::new(1), "s1-eth3", PortNo::new(3).unwrap());
        assert_eq!(intf.name(), "s1-eth3");
        assert_eq!(intf.port().as_u32(), 3);
        assert!(intf.link().is_none());

        intf.set_link(LinkId::new(9));
        assert_eq!(intf.link(), Some(LinkId::new(9)));
    }

    #[test]
    fn test_display() {
        let intf = Interface::new(IntfId::new(2), "h1-eth0", PortNo::BASE);
        assert_eq!(intf.to_string(), "h1-eth0");
        assert_eq!(IntfId::new(2).to_string(), "intf#2");
    }
}
