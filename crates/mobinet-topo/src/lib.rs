//! Topology registry and live host mobility.
//!
//! This crate is the bookkeeping core of the emulator:
//!
//! - [`VirtualSwitch`]: per-switch interface registry, indexed by port
//!   and by name, mirrored into a forwarding plane
//! - [`ControllerAffinityMap`] / [`ControllerSelectionPolicy`]: which
//!   controller a switch binds to at start
//! - [`Topology`]: the arena owning switches, hosts, and links
//! - [`migrate`]: the live migration sequence (detach, unregister,
//!   register, rebind, validate)
//! - [`inspect`]: read-only adjacency reports
//!
//! # Ownership model
//!
//! An [`Interface`] is held by value in exactly one node's registry.
//! Migration moves the value itself between registries, so an interface
//! owned by two switches at once is unrepresentable. Links refer to
//! interfaces by stable [`IntfId`], which survives both renames and
//! ownership changes.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mobinet_plane::{SimNetDev, SimPlane};
//! use mobinet_topo::{migrate, AffinityPolicy, ControllerAffinityMap, Topology};
//! use mobinet_types::{ControllerEndpoint, PortNo};
//!
//! let map = ControllerAffinityMap::new()
//!     .with_binding("s1", ControllerEndpoint::new("127.0.0.1", 6653)?)
//!     .with_binding("s2", ControllerEndpoint::new("127.0.0.1", 6654)?);
//! let mut topo = Topology::new(
//!     Arc::new(SimPlane::new()),
//!     Arc::new(SimNetDev::new()),
//!     Arc::new(AffinityPolicy::new(map)),
//! );
//! topo.add_switch("s1")?;
//! topo.add_switch("s2")?;
//! topo.add_host("h1")?;
//! topo.add_link("h1", "s1").await?;
//! topo.start_all(&[]).await?;
//! let moved = migrate::move_host(&mut topo, "h1", "s1", "s2", None).await?;
//! ```

mod affinity;
mod error;
mod host;
pub mod inspect;
mod intf;
mod link;
pub mod migrate;
mod switch;
mod topology;

pub use affinity::{
    AffinityPolicy, ControllerAffinityMap, ControllerSelectionPolicy, RoundRobinPolicy,
};
pub use error::{TopoError, TopoResult};
pub use host::Host;
pub use intf::{Interface, IntfId};
pub use link::{Link, LinkId};
pub use migrate::{HostMigration, MigrationReport};
pub use switch::{PortValidation, VirtualSwitch};
pub use topology::Topology;
