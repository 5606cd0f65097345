//! Scripted mobility run: report the fabric, migrate a host across
//! domains, flush stale flows, report again.

use anyhow::Result;
use rand::Rng;
use tracing::info;

use mobinet_topo::{inspect, migrate, Topology};
use mobinet_types::PortNo;

/// Parameters for one host move.
#[derive(Debug, Clone)]
pub struct MoveSpec {
    pub host: String,
    pub from: String,
    pub to: String,
    /// Destination port; drawn at random when absent.
    pub port: Option<PortNo>,
}

/// Runs the scenario against an already started topology.
pub async fn run(topo: &mut Topology, spec: &MoveSpec, json: bool) -> Result<()> {
    print_connections(topo, json)?;

    let port = match spec.port {
        Some(no) => no,
        None => random_port()?,
    };
    println!(
        "* Moving {} from {} to {} port {}",
        spec.host, spec.from, spec.to, port
    );
    let moved = migrate::move_host(topo, &spec.host, &spec.from, &spec.to, Some(port)).await?;
    println!(
        "* {} is now connected to {}",
        moved.host_intf, moved.switch_intf
    );
    if !moved.report.port_matched() {
        println!(
            "* Note: datapath assigned port {} instead of {}",
            moved.report.actual, moved.report.requested
        );
    }

    // Stale flows on every switch still point at the old attachment;
    // flushing forces the controllers to re-learn the new path.
    println!("* Clearing out old flows");
    topo.clear_all_flows().await?;

    info!(
        elapsed_ms = moved.report.elapsed.as_millis() as u64,
        "Migration complete"
    );
    if json {
        println!("{}", serde_json::to_string_pretty(&moved)?);
    } else {
        println!("* Move took {:?}", moved.report.elapsed);
    }

    println!("* New network:");
    print_connections(topo, json)?;
    Ok(())
}

/// Picks a destination port above the range the chain links occupy.
fn random_port() -> Result<PortNo> {
    let no = rand::thread_rng().gen_range(10..=20);
    Ok(PortNo::new(no)?)
}

fn print_connections(topo: &Topology, json: bool) -> Result<()> {
    let report = inspect::connections(topo);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in &report {
            println!("{line}");
        }
    }
    Ok(())
}
