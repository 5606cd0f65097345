//! Switch-to-controller binding.
//!
//! The affinity map is built once, before any switch starts, and never
//! mutated afterwards. Switches do not read it directly; they go
//! through a [`ControllerSelectionPolicy`], so alternative placement
//! schemes can be swapped in without touching the switch type.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use mobinet_types::ControllerEndpoint;

use crate::error::{TopoError, TopoResult};

/// Immutable mapping from switch name to controller endpoint.
///
/// Lookups on a missing switch are fatal to that switch's start: a
/// switch with no assigned controller cannot be part of the fabric.
#[derive(Debug, Clone, Default)]
pub struct ControllerAffinityMap {
    bindings: HashMap<String, ControllerEndpoint>,
}

impl ControllerAffinityMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding, builder style.
    pub fn with_binding(
        mut self,
        switch: impl Into<String>,
        endpoint: ControllerEndpoint,
    ) -> Self {
        self.bindings.insert(switch.into(), endpoint);
        self
    }

    /// Adds a binding during construction.
    pub fn insert(&mut self, switch: impl Into<String>, endpoint: ControllerEndpoint) {
        self.bindings.insert(switch.into(), endpoint);
    }

    /// Resolves the controller for a switch.
    pub fn lookup(&self, switch: &str) -> TopoResult<&ControllerEndpoint> {
        self.bindings
            .get(switch)
            .ok_or_else(|| TopoError::misconfigured_affinity(switch))
    }

    /// Returns true if the switch has a binding.
    pub fn contains(&self, switch: &str) -> bool {
        self.bindings.contains_key(switch)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if no bindings exist.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Chooses the controller a switch binds to at start.
///
/// `candidates` is whatever list the topology runner passed to `start`;
/// policies are free to ignore it.
pub trait ControllerSelectionPolicy: Send + Sync {
    /// Returns the endpoint the switch must connect to.
    fn select(
        &self,
        switch: &str,
        candidates: &[ControllerEndpoint],
    ) -> TopoResult<ControllerEndpoint>;
}

/// Default policy: consult the affinity map, ignore candidates.
#[derive(Debug)]
pub struct AffinityPolicy {
    map: ControllerAffinityMap,
}

impl AffinityPolicy {
    pub fn new(map: ControllerAffinityMap) -> Self {
        Self { map }
    }

    /// Read access to the underlying map.
    pub fn map(&self) -> &ControllerAffinityMap {
        &self.map
    }
}

impl ControllerSelectionPolicy for AffinityPolicy {
    fn select(
        &self,
        switch: &str,
        _candidates: &[ControllerEndpoint],
    ) -> TopoResult<ControllerEndpoint> {
        self.map.lookup(switch).cloned()
    }
}

/// Alternative policy: rotate through the supplied candidate list.
///
/// Useful for spreading an unpinned fabric across a controller pool.
/// Fails like a missing affinity entry when the candidate list is
/// empty, since the switch still ends up with no controller.
#[derive(Debug, Default)]
pub struct RoundRobinPolicy {
    next: AtomicUsize,
}

impl RoundRobinPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ControllerSelectionPolicy for RoundRobinPolicy {
    fn select(
        &self,
        switch: &str,
        candidates: &[ControllerEndpoint],
    ) -> TopoResult<ControllerEndpoint> {
        if candidates.is_empty() {
            return Err(TopoError::misconfigured_affinity(switch));
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Ok(candidates[idx].clone())
    }
}
