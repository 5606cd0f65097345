//! Topology edges.

use serde::Serialize;
use std::fmt;

use crate::intf::IntfId;

/// Stable identity of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LinkId(u64);

impl LinkId {
    pub const fn new(raw: u64) -> Self {
        LinkId(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// An unordered pair of interfaces representing one cable.
///
/// The pair is written once at build time and never rewritten by a
/// migration: moving an interface changes which node owns it, not
/// which link it belongs to.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Link {
    a: IntfId,
    b: IntfId,
}

impl Link {
    pub fn new(a: IntfId, b: IntfId) -> Self {
        Self { a, b }
    }

    pub fn endpoints(&self) -> (IntfId, IntfId) {
        (self.a, self.b)
    }

    /// Returns the other endpoint, or `None` if `id` is not on this link.
    pub fn peer_of(&self, id: IntfId) -> Option<IntfId> {
        if id == self.a {
            Some(self.b)
        } else if id == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// Returns true if `id` is one of the endpoints.
    pub fn connects(&self, id: IntfId) -> bool {
        id == self.a || id == self.b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_of() {
        let link = Link::new(IntfId::new(1), IntfId::new(2));
        assert_eq!(link.peer_of(IntfId::new(1)), Some(IntfId::new(2)));
        assert_eq!(link.peer_of(IntfId::new(2)), Some(IntfId::new(1)));
        assert_eq!(link.peer_of(IntfId::new(3)), None);
    }

    #[test]
    fn test_connects() {
        let link = Link::new(IntfId::new(1), IntfId::new(2));
        assert!(link.connects(IntfId::new(1)));
        assert!(!link.connects(IntfId::new(7)));
    }
}
