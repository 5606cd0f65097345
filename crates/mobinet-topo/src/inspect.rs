//! Read-only adjacency reporting.
//!
//! Inspection is separated from computation: these functions return
//! structured values, and rendering (text or JSON) is the caller's
//! business. Used to observe the fabric before and after migrations.

use serde::Serialize;
use std::fmt;

use mobinet_types::PortNo;

use crate::error::TopoResult;
use crate::switch::VirtualSwitch;
use crate::topology::Topology;

/// One `(remote node, local port)` adjacency entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerEntry {
    /// The node on the other end of the link.
    pub remote: String,
    /// Port the link occupies on the inspected switch.
    pub local_port: PortNo,
}

/// Adjacency of one switch: its linked neighbors in port order.
///
/// Interfaces without a link are silently skipped.
#[derive(Debug, Clone, Serialize)]
pub struct SwitchConnections {
    /// The inspected switch.
    pub switch: String,
    /// Neighbor entries in local port order.
    pub peers: Vec<PeerEntry>,
}

impl fmt::Display for SwitchConnections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.switch)?;
        for peer in &self.peers {
            write!(f, " {}({})", peer.remote, peer.local_port)?;
        }
        Ok(())
    }
}

/// Reports the adjacency of every switch, in insertion order.
pub fn connections(topo: &Topology) -> Vec<SwitchConnections> {
    topo.switches()
        .map(|switch| connections_of(topo, switch))
        .collect()
}

/// Reports the adjacency of the named switches, in the given order.
pub fn connections_for(topo: &Topology, switches: &[&str]) -> TopoResult<Vec<SwitchConnections>> {
    switches
        .iter()
        .map(|name| {
            topo.require_switch(name)
                .map(|switch| connections_of(topo, switch))
        })
        .collect()
}

fn connections_of(topo: &Topology, switch: &VirtualSwitch) -> SwitchConnections {
    let mut peers = Vec::new();
    for intf in switch.interfaces() {
        let Some(link_id) = intf.link() else {
            continue;
        };
        let Some(link) = topo.link(link_id) else {
            continue;
        };
        let Some(peer_id) = link.peer_of(intf.id()) else {
            continue;
        };
        let Some((owner, _)) = topo.interface_location(peer_id) else {
            continue;
        };
        peers.push(PeerEntry {
            remote: owner.to_string(),
            local_port: intf.port(),
        });
    }
    SwitchConnections {
        switch: switch.name().to_string(),
        peers,
    }
}
