//! Mobility scenario driver for the mobinet emulator.
//!
//! mobilityd builds a multi-domain fabric, binds each switch to its
//! domain controller, and live-migrates a host between switches while
//! the fabric stays up.
//!
//! Key features:
//! - Load a topology description from JSON or use the built-in chain
//! - Drive either the real Open vSwitch backend or the in-memory one
//! - Report switch adjacencies before and after the move
//! - Flush stale flows so controllers re-learn the new path

pub mod config;
pub mod demo;

pub use config::{ControllerConfig, SwitchConfig, TopoConfig};
pub use demo::MoveSpec;
