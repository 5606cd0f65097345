//! Error types for topology and migration operations.

use mobinet_plane::PlaneError;
use mobinet_types::PortNo;
use thiserror::Error;

/// Result type alias for topology operations.
pub type TopoResult<T> = Result<T, TopoError>;

/// Errors that can occur while building, starting, or mutating a topology.
///
/// All of these abort the enclosing operation and are surfaced to the
/// caller; none are retried. Port-number disagreement with the
/// forwarding plane is deliberately NOT an error — see
/// [`PortValidation`](crate::PortValidation).
#[derive(Debug, Error)]
pub enum TopoError {
    /// No controller is mapped for a switch at start time.
    #[error("No controller mapped for switch '{switch}'")]
    MisconfiguredAffinity {
        /// The switch with no affinity entry.
        switch: String,
    },

    /// The requested port number is already occupied on the switch.
    #[error("Port {port} already in use on switch '{switch}'")]
    PortCollision {
        /// The switch whose registry rejected the port.
        switch: String,
        /// The occupied port number.
        port: PortNo,
    },

    /// The named interface is not registered on the switch.
    #[error("Interface '{intf}' not registered on switch '{switch}'")]
    InterfaceNotFound {
        /// The switch that was asked.
        switch: String,
        /// The interface name.
        intf: String,
    },

    /// A host-level move was requested for a host with no link to the
    /// named switch.
    #[error("Host '{host}' has no connection to switch '{switch}'")]
    HostNotConnected {
        /// The host.
        host: String,
        /// The switch it was expected to be attached to.
        switch: String,
    },

    /// `start` was called on a switch that already bound its controller.
    #[error("Switch '{switch}' already started")]
    AlreadyStarted {
        /// The switch.
        switch: String,
    },

    /// A node name did not resolve to any switch or host.
    #[error("Unknown node: '{name}'")]
    UnknownNode {
        /// The unresolved name.
        name: String,
    },

    /// A node was added under a name that is already taken.
    #[error("Duplicate node name: '{name}'")]
    DuplicateNode {
        /// The colliding name.
        name: String,
    },

    /// A forwarding-plane or netdev command failed.
    #[error("Forwarding plane failure: {0}")]
    Plane(#[from] PlaneError),
}

impl TopoError {
    /// Creates a misconfigured-affinity error.
    pub fn misconfigured_affinity(switch: impl Into<String>) -> Self {
        Self::MisconfiguredAffinity {
            switch: switch.into(),
        }
    }

    /// Creates a port-collision error.
    pub fn port_collision(switch: impl Into<String>, port: PortNo) -> Self {
        Self::PortCollision {
            switch: switch.into(),
            port,
        }
    }

    /// Creates an interface-not-found error.
    pub fn interface_not_found(switch: impl Into<String>, intf: impl Into<String>) -> Self {
        Self::InterfaceNotFound {
            switch: switch.into(),
            intf: intf.into(),
        }
    }

    /// Creates a host-not-connected error.
    pub fn host_not_connected(host: impl Into<String>, switch: impl Into<String>) -> Self {
        Self::HostNotConnected {
            host: host.into(),
            switch: switch.into(),
        }
    }

    /// Creates an unknown-node error.
    pub fn unknown_node(name: impl Into<String>) -> Self {
        Self::UnknownNode { name: name.into() }
    }

    /// Creates a duplicate-node error.
    pub fn duplicate_node(name: impl Into<String>) -> Self {
        Self::DuplicateNode { name: name.into() }
    }
}
