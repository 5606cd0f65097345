//! Forwarding-plane clients for virtual switch topologies.
//!
//! The topology layer drives datapaths through the [`ForwardingPlane`]
//! and [`NetDev`] traits. [`OvsPlane`] and [`IpNetDev`] shell out to
//! `ovs-vsctl`, `ovs-ofctl` and `ip`; [`SimPlane`] and [`SimNetDev`]
//! model the same behavior in memory for tests and rootless runs.

pub mod commands;
mod error;
mod netdev;
mod ovs;
mod plane;
pub mod shell;
mod sim;

pub use error::{PlaneError, PlaneResult};
pub use netdev::IpNetDev;
pub use ovs::OvsPlane;
pub use plane::{ForwardingPlane, NetDev, PlaneVersion};
pub use sim::{SimNetDev, SimOp, SimPlane};
