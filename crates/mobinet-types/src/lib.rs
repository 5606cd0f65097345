//! Common typed network primitives for the mobinet emulator.
//!
//! This crate provides type-safe representations of the identifiers the
//! emulated fabric is built from:
//!
//! - [`PortNo`]: OpenFlow-style port numbers on a switch
//! - [`ControllerEndpoint`]: the `(host, port)` target a switch's control
//!   channel connects to
//! - [`ifname`]: canonical interface naming (`"<node>-eth<port>"`)

mod endpoint;
pub mod ifname;
mod port;

pub use endpoint::ControllerEndpoint;
pub use port::PortNo;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid port number: {0} (reserved OpenFlow range)")]
    InvalidPortNo(u32),

    #[error("invalid controller endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("invalid interface name: {0}")]
    InvalidIntfName(String),
}
