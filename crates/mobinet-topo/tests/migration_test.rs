//! End-to-end topology and mobility tests on the simulated plane.
//!
//! These exercise the full cycle a real deployment goes through:
//! build, start, inspect, migrate a host, flush flows, inspect again,
//! tear down.

use std::sync::Arc;

use mobinet_plane::{PlaneVersion, SimNetDev, SimOp, SimPlane};
use mobinet_topo::{
    inspect, migrate, AffinityPolicy, ControllerAffinityMap, TopoError, Topology,
};
use mobinet_types::{ControllerEndpoint, PortNo};

fn endpoint(port: u16) -> ControllerEndpoint {
    ControllerEndpoint::new("127.0.0.1", port).unwrap()
}

fn port(no: u32) -> PortNo {
    PortNo::new(no).unwrap()
}

struct Sim {
    plane: Arc<SimPlane>,
    netdev: Arc<SimNetDev>,
}

impl Sim {
    fn new() -> Self {
        Self::with_plane(SimPlane::new())
    }

    fn with_plane(plane: SimPlane) -> Self {
        Self {
            plane: Arc::new(plane),
            netdev: Arc::new(SimNetDev::new()),
        }
    }

    fn topology(&self, map: ControllerAffinityMap) -> Topology {
        Topology::new(
            self.plane.clone(),
            self.netdev.clone(),
            Arc::new(AffinityPolicy::new(map)),
        )
    }
}

/// Four switches in a chain with one host on s1, split across two
/// controller domains, started and ready to migrate.
async fn mobility_fabric(sim: &Sim) -> Topology {
    let map = ControllerAffinityMap::new()
        .with_binding("s1", endpoint(6653))
        .with_binding("s2", endpoint(6653))
        .with_binding("s3", endpoint(6654))
        .with_binding("s4", endpoint(6654));
    let mut topo = sim.topology(map);
    for name in ["s1", "s2", "s3", "s4"] {
        topo.add_switch(name).unwrap();
    }
    topo.add_host("h1").unwrap();
    topo.add_link("h1", "s1").await.unwrap();
    topo.add_link("s1", "s2").await.unwrap();
    topo.add_link("s2", "s3").await.unwrap();
    topo.add_link("s3", "s4").await.unwrap();
    topo.start_all(&[]).await.unwrap();
    topo
}

#[tokio::test]
async fn test_full_mobility_cycle() {
    let sim = Sim::new();
    let mut topo = mobility_fabric(&sim).await;

    // Every switch bound to its own domain's controller
    assert_eq!(sim.plane.controller_of("s1").await.unwrap().port(), 6653);
    assert_eq!(sim.plane.controller_of("s3").await.unwrap().port(), 6654);

    let before = inspect::connections(&topo);
    assert_eq!(before[0].to_string(), "s1: h1(1) s2(2)");

    let moved = migrate::move_host(&mut topo, "h1", "s1", "s3", Some(port(12)))
        .await
        .unwrap();
    assert_eq!(moved.host_intf, "h1-eth0");
    assert_eq!(moved.switch_intf, "s3-eth12");
    assert!(moved.report.port_matched());

    // Controllers re-learn paths after the move
    topo.clear_all_flows().await.unwrap();
    for name in ["s1", "s2", "s3", "s4"] {
        assert_eq!(sim.plane.flows_cleared(name).await, 1);
    }

    let after = inspect::connections(&topo);
    assert_eq!(after[0].to_string(), "s1: s2(2)");
    assert_eq!(after[2].to_string(), "s3: s2(1) s4(2) h1(12)");

    // The datapath agrees with the registry on both sides
    assert_eq!(sim.plane.port_of("s1", "s1-eth1").await, None);
    assert_eq!(sim.plane.port_of("s3", "s3-eth12").await, Some(port(12)));

    topo.teardown().await.unwrap();
    for name in ["s1", "s2", "s3", "s4"] {
        assert!(!sim.plane.has_bridge(name).await);
    }
    assert!(!sim.netdev.exists("h1-eth0").await);
}

#[tokio::test]
async fn test_migration_transfers_ownership_and_preserves_link() {
    let sim = Sim::new();
    let map = ControllerAffinityMap::new()
        .with_binding("A", endpoint(6653))
        .with_binding("B", endpoint(6653));
    let mut topo = sim.topology(map);
    topo.add_switch("A").unwrap();
    topo.add_switch("B").unwrap();
    for host in ["hx", "hy", "H"] {
        topo.add_host(host).unwrap();
    }
    // Fill ports 1 and 2 so H lands on port 3 of A
    topo.add_link("hx", "A").await.unwrap();
    topo.add_link("hy", "A").await.unwrap();
    topo.add_link("H", "A").await.unwrap();
    topo.start_all(&[]).await.unwrap();

    let h_intf = topo.host("H").unwrap().default_interface().unwrap();
    let h_id = h_intf.id();
    let link_id = h_intf.link().unwrap();
    let moved_id = topo.link(link_id).unwrap().peer_of(h_id).unwrap();
    assert_eq!(topo.switch("A").unwrap().interface(port(3)).unwrap().id(), moved_id);

    let report = migrate::move_interface(&mut topo, "A", "A-eth3", "B", port(7), true)
        .await
        .unwrap();
    assert_eq!(report.new_name, "B-eth7");

    // Source holds no trace, in either index
    let a = topo.switch("A").unwrap();
    assert!(!a.contains_port(port(3)));
    assert!(!a.contains_name("A-eth3"));
    assert!(a.interface_by_id(moved_id).is_none());

    // Destination owns it under the requested port and canonical name
    let b = topo.switch("B").unwrap();
    let landed = b.interface(port(7)).unwrap();
    assert_eq!(landed.id(), moved_id);
    assert_eq!(landed.name(), "B-eth7");

    // The link is untouched: same id, same endpoints, new owner
    assert_eq!(landed.link(), Some(link_id));
    let link = topo.link(link_id).unwrap();
    assert!(link.connects(h_id));
    assert!(link.connects(moved_id));
    assert_eq!(topo.interface_location(moved_id).unwrap().0, "B");
    let (owner, peer) = topo.interface_location(h_id).unwrap();
    assert_eq!(owner, "H");
    assert_eq!(peer.name(), "H-eth0");
}

#[tokio::test]
async fn test_port_disagreement_is_preserved_not_corrected() {
    let sim = Sim::new();
    let mut topo = mobility_fabric(&sim).await;
    // The datapath will answer the s2 bind with port 13, not the request
    sim.plane.force_port("s2", "s2-eth7", port(13)).await;

    let moved = migrate::move_host(&mut topo, "h1", "s1", "s2", Some(port(7)))
        .await
        .unwrap();

    // Migration completed; both values are reported
    assert!(!moved.report.port_matched());
    assert_eq!(moved.report.requested, port(7));
    assert_eq!(moved.report.actual, port(13));

    // Registry keeps the request, the datapath keeps its own answer
    let s2 = topo.switch("s2").unwrap();
    assert_eq!(s2.interface(port(7)).unwrap().name(), "s2-eth7");
    assert!(!s2.contains_port(port(13)));
    assert_eq!(sim.plane.port_of("s2", "s2-eth7").await, Some(port(13)));

    // The canonical name follows the registry port, not the actual one
    assert_eq!(moved.switch_intf, "s2-eth7");
}

#[tokio::test]
async fn test_legacy_datapath_never_requests_ports() {
    let sim = Sim::with_plane(SimPlane::with_version(PlaneVersion::Legacy));
    let mut topo = mobility_fabric(&sim).await;

    let moved = migrate::move_host(&mut topo, "h1", "s1", "s4", Some(port(9)))
        .await
        .unwrap();

    // Registry records the request even though the datapath assigned
    // its own number
    assert_eq!(moved.report.requested, port(9));
    assert_ne!(moved.report.actual, port(9));
    assert_eq!(moved.switch_intf, "s4-eth9");

    let log = sim.plane.log().await;
    assert!(log.iter().all(|cmd| !cmd.contains("ofport_request")));
}

#[tokio::test]
async fn test_failed_detach_aborts_before_any_bookkeeping() {
    let sim = Sim::new();
    let mut topo = mobility_fabric(&sim).await;
    sim.plane.fail_next(SimOp::UnbindPort).await;

    let err = migrate::move_host(&mut topo, "h1", "s1", "s2", Some(port(7)))
        .await
        .unwrap_err();
    assert!(matches!(err, TopoError::Plane(_)));

    // Step one failed, so no registry was touched on either side
    assert!(topo.switch("s1").unwrap().contains_name("s1-eth1"));
    let s2 = topo.switch("s2").unwrap();
    assert!(!s2.contains_port(port(7)));
    assert!(!s2.contains_name("s2-eth7"));
    assert_eq!(sim.plane.port_of("s1", "s1-eth1").await, Some(port(1)));
}

#[tokio::test]
async fn test_chained_migrations_keep_registries_consistent() {
    let sim = Sim::new();
    let mut topo = mobility_fabric(&sim).await;

    migrate::move_host(&mut topo, "h1", "s1", "s2", Some(port(10)))
        .await
        .unwrap();
    migrate::move_host(&mut topo, "h1", "s2", "s3", Some(port(11)))
        .await
        .unwrap();
    let last = migrate::move_host(&mut topo, "h1", "s3", "s4", None)
        .await
        .unwrap();

    // s4 had one chain link (port 1), so the free port is 2
    assert_eq!(last.switch_intf, "s4-eth2");

    // Every stop along the way released its attachment
    assert!(!topo.switch("s1").unwrap().contains_name("s1-eth1"));
    assert!(!topo.switch("s2").unwrap().contains_port(port(10)));
    assert!(!topo.switch("s3").unwrap().contains_port(port(11)));

    // Exactly one switch-side interface for h1 exists in the fabric
    let h_id = topo.host("h1").unwrap().default_interface().unwrap().id();
    let link_id = topo
        .host("h1")
        .unwrap()
        .default_interface()
        .unwrap()
        .link()
        .unwrap();
    let peer_id = topo.link(link_id).unwrap().peer_of(h_id).unwrap();
    let (owner, intf) = topo.interface_location(peer_id).unwrap();
    assert_eq!(owner, "s4");
    assert_eq!(intf.name(), "s4-eth2");
}
