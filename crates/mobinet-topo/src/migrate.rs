//! Live interface migration between switches.
//!
//! A migration runs strictly in order: detach the live binding on the
//! source, unregister there, register on the destination, bind into the
//! destination's forwarding plane, validate the assignment. The caller
//! holds `&mut Topology` for the whole sequence, so nothing can observe
//! an interface owned by both switches or neither.
//!
//! There is no rollback. If a step fails after the source has given the
//! interface up, the interface is left unregistered on both switches;
//! the surfaced error names the step that failed.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument};

use mobinet_types::PortNo;

use crate::error::TopoResult;
use crate::topology::Topology;

/// Record of one completed migration.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Source switch.
    pub from: String,
    /// Destination switch.
    pub to: String,
    /// Interface name before the move.
    pub old_name: String,
    /// Interface name after the move (canonical unless rename was off).
    pub new_name: String,
    /// Port recorded in the destination registry.
    pub requested: PortNo,
    /// Port the forwarding plane reports for the new binding.
    pub actual: PortNo,
    /// Wall-clock duration of the whole sequence.
    pub elapsed: Duration,
}

impl MigrationReport {
    /// Returns true if the forwarding plane honored the port request.
    pub fn port_matched(&self) -> bool {
        self.requested == self.actual
    }
}

/// Outcome of a host-level move: the interface pair that connected the
/// host to the old switch, plus the underlying migration report.
#[derive(Debug, Clone, Serialize)]
pub struct HostMigration {
    /// Host-side interface name (unchanged by the move).
    pub host_intf: String,
    /// Switch-side interface name after the move.
    pub switch_intf: String,
    /// The migration itself.
    pub report: MigrationReport,
}

/// Moves one interface from `from` to `to`, requesting `requested` as
/// its port on the destination.
///
/// Steps run strictly in order; any failure aborts the remainder and
/// surfaces immediately. A destination-side failure (for example
/// `PortCollision`) leaves the destination registry untouched but the
/// source already mutated - the interface ends up registered nowhere.
#[instrument(skip(topo))]
pub async fn move_interface(
    topo: &mut Topology,
    from: &str,
    intf: &str,
    to: &str,
    requested: PortNo,
    rename: bool,
) -> TopoResult<MigrationReport> {
    let started = Instant::now();
    // Name resolution up front; not a migration step, mutates nothing.
    topo.require_switch(to)?;

    let src = topo.require_switch_mut(from)?;
    src.detach(intf).await?;
    let moved = src.del_interface(intf)?;
    let old_name = moved.name().to_string();

    let dst = topo.require_switch_mut(to)?;
    let new_name = dst.add_interface(moved, requested, rename).await?;
    dst.attach(&new_name).await?;
    let validation = dst.validate_port(&new_name).await?;

    let report = MigrationReport {
        from: from.to_string(),
        to: to.to_string(),
        old_name,
        new_name,
        requested,
        actual: validation.actual,
        elapsed: started.elapsed(),
    };
    info!(
        intf = %report.new_name,
        from = %report.from,
        to = %report.to,
        port = %report.requested,
        elapsed = ?report.elapsed,
        "Interface migrated"
    );
    Ok(report)
}

/// Moves a host's attachment from `old_switch` to `new_switch`.
///
/// Resolves the single interface pair connecting the host to the old
/// switch (failing with `HostNotConnected`, before any mutation, if
/// there is none) and migrates the switch-side interface with canonical
/// renaming. Without an explicit `new_port`, the destination's next
/// free port is used.
#[instrument(skip(topo))]
pub async fn move_host(
    topo: &mut Topology,
    host: &str,
    old_switch: &str,
    new_switch: &str,
    new_port: Option<PortNo>,
) -> TopoResult<HostMigration> {
    let (host_intf, switch_intf) = topo.connection_between(host, old_switch)?;
    let requested = match new_port {
        Some(port) => port,
        None => topo.next_port(new_switch)?,
    };

    let report = move_interface(topo, old_switch, &switch_intf, new_switch, requested, true).await?;
    info!(
        host = %host,
        from = %old_switch,
        to = %new_switch,
        intf = %report.new_name,
        "Host moved"
    );
    Ok(HostMigration {
        host_intf,
        switch_intf: report.new_name.clone(),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity::{AffinityPolicy, ControllerAffinityMap};
    use crate::error::TopoError;
    use mobinet_plane::{SimNetDev, SimPlane};
    use mobinet_types::ControllerEndpoint;
    use std::sync::Arc;

    fn endpoint(port: u16) -> ControllerEndpoint {
        ControllerEndpoint::new("127.0.0.1", port).unwrap()
    }

    fn port(no: u32) -> PortNo {
        PortNo::new(no).unwrap()
    }

    struct Fixture {
        plane: Arc<SimPlane>,
        netdev: Arc<SimNetDev>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                plane: Arc::new(SimPlane::new()),
                netdev: Arc::new(SimNetDev::new()),
            }
        }
    }

    /// h1 - s1 - s2, both switches mapped to one controller and started.
    async fn started_chain(fx: &Fixture) -> Topology {
        let map = ControllerAffinityMap::new()
            .with_binding("s1", endpoint(6653))
            .with_binding("s2", endpoint(6654));
        let mut topo = Topology::new(
            fx.plane.clone(),
            fx.netdev.clone(),
            Arc::new(AffinityPolicy::new(map)),
        );
        topo.add_switch("s1").unwrap();
        topo.add_switch("s2").unwrap();
        topo.add_host("h1").unwrap();
        topo.add_link("h1", "s1").await.unwrap();
        topo.start_all(&[]).await.unwrap();
        topo
    }

    #[tokio::test]
    async fn test_move_interface_detaches_before_attaching() {
        let fx = Fixture::new();
        let mut topo = started_chain(&fx).await;

        move_interface(&mut topo, "s1", "s1-eth1", "s2", port(7), true)
            .await
            .unwrap();

        let log = fx.plane.log().await;
        let del = log
            .iter()
            .position(|c| c.contains("del-port \"s1\" \"s1-eth1\""))
            .unwrap();
        let add = log
            .iter()
            .position(|c| c.contains("add-port \"s2\" \"s2-eth7\""))
            .unwrap();
        let query = log
            .iter()
            .position(|c| c.contains("get Interface \"s2-eth7\""))
            .unwrap();
        assert!(del < add);
        assert!(add < query);
    }

    #[tokio::test]
    async fn test_move_interface_report() {
        let fx = Fixture::new();
        let mut topo = started_chain(&fx).await;

        let report = move_interface(&mut topo, "s1", "s1-eth1", "s2", port(7), true)
            .await
            .unwrap();
        assert_eq!(report.from, "s1");
        assert_eq!(report.to, "s2");
        assert_eq!(report.old_name, "s1-eth1");
        assert_eq!(report.new_name, "s2-eth7");
        assert_eq!(report.requested, port(7));
        assert_eq!(report.actual, port(7));
        assert!(report.port_matched());
    }

    #[tokio::test]
    async fn test_move_to_unknown_switch_mutates_nothing() {
        let fx = Fixture::new();
        let mut topo = started_chain(&fx).await;

        let err = move_interface(&mut topo, "s1", "s1-eth1", "ghost", port(7), true)
            .await
            .unwrap_err();
        assert!(matches!(err, TopoError::UnknownNode { .. }));
        // Name resolution happens before step one, so the source is intact
        assert!(topo.switch("s1").unwrap().contains_name("s1-eth1"));
        assert_eq!(fx.plane.port_of("s1", "s1-eth1").await, Some(port(1)));
    }

    #[tokio::test]
    async fn test_port_collision_leaves_destination_untouched() {
        let fx = Fixture::new();
        let mut topo = started_chain(&fx).await;
        // Occupy port 1 on the destination
        topo.add_host("h2").unwrap();
        topo.add_link("h2", "s2").await.unwrap();
        let s2_occupied = topo.switch("s2").unwrap().interface(port(1)).unwrap().name().to_string();

        let err = move_interface(&mut topo, "s1", "s1-eth1", "s2", port(1), true)
            .await
            .unwrap_err();
        assert!(matches!(err, TopoError::PortCollision { .. }));

        // Destination registry unchanged
        let s2 = topo.switch("s2").unwrap();
        assert_eq!(s2.len(), 1);
        assert_eq!(s2.interface(port(1)).unwrap().name(), s2_occupied);
        // Source already gave the interface up: registered nowhere now
        assert!(!topo.switch("s1").unwrap().contains_name("s1-eth1"));
    }

    #[tokio::test]
    async fn test_move_host_resolves_pair() {
        let fx = Fixture::new();
        let mut topo = started_chain(&fx).await;

        let outcome = move_host(&mut topo, "h1", "s1", "s2", Some(port(9)))
            .await
            .unwrap();
        assert_eq!(outcome.host_intf, "h1-eth0");
        assert_eq!(outcome.switch_intf, "s2-eth9");
        assert_eq!(outcome.report.requested, port(9));
    }

    #[tokio::test]
    async fn test_move_host_defaults_to_next_free_port() {
        let fx = Fixture::new();
        let mut topo = started_chain(&fx).await;

        let outcome = move_host(&mut topo, "h1", "s1", "s2", None).await.unwrap();
        // s2 had no interfaces, so the first free switch port is 1
        assert_eq!(outcome.report.requested, port(1));
        assert_eq!(outcome.switch_intf, "s2-eth1");
    }

    #[tokio::test]
    async fn test_move_host_not_connected_mutates_nothing() {
        let fx = Fixture::new();
        let mut topo = started_chain(&fx).await;

        // h1 is attached to s1, not s2
        let err = move_host(&mut topo, "h1", "s2", "s1", Some(port(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, TopoError::HostNotConnected { .. }));
        assert!(topo.switch("s1").unwrap().contains_name("s1-eth1"));
        assert_eq!(topo.switch("s2").unwrap().len(), 0);
        assert_eq!(fx.plane.port_of("s1", "s1-eth1").await, Some(port(1)));
    }

    #[tokio::test]
    async fn test_failed_rebind_surfaces_without_rollback() {
        let fx = Fixture::new();
        let mut topo = started_chain(&fx).await;
        fx.plane.fail_next(mobinet_plane::SimOp::BindPort).await;

        let err = move_interface(&mut topo, "s1", "s1-eth1", "s2", port(7), true)
            .await
            .unwrap_err();
        assert!(matches!(err, TopoError::Plane(_)));
        // No rollback: the registry handover already happened even
        // though the datapath never bound the new name
        assert!(!topo.switch("s1").unwrap().contains_name("s1-eth1"));
        assert!(topo.switch("s2").unwrap().contains_name("s2-eth7"));
        assert_eq!(fx.plane.port_of("s2", "s2-eth7").await, None);
    }
}
