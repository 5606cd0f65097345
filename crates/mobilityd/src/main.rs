//! mobilityd entry point.
//!
//! Parses the command line, builds the requested backend, then runs the
//! mobility scenario end to end.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mobilityd::{demo, MoveSpec, TopoConfig};
use mobinet_plane::{ForwardingPlane, IpNetDev, NetDev, OvsPlane, SimNetDev, SimPlane};
use mobinet_topo::{AffinityPolicy, Topology};
use mobinet_types::PortNo;

/// Multi-domain host mobility driver
#[derive(Parser, Debug)]
#[command(name = "mobilityd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Topology description file (JSON); built-in 17-switch chain when omitted
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Forwarding backend: "sim" or "ovs"
    #[arg(short = 'b', long, default_value = "sim")]
    backend: String,

    /// Host to migrate
    #[arg(long, default_value = "h1")]
    host: String,

    /// Switch the host is currently attached to
    #[arg(long, default_value = "s1")]
    from: String,

    /// Switch to migrate the host onto
    #[arg(long, default_value = "s7")]
    to: String,

    /// Destination port number (random 10-20 when omitted)
    #[arg(short = 'p', long)]
    port: Option<u32>,

    /// Emit reports as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

/// Initialize tracing/logging.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => TopoConfig::load(path)?,
        None => TopoConfig::default_chain(),
    };

    let (plane, netdev): (Arc<dyn ForwardingPlane>, Arc<dyn NetDev>) = match args.backend.as_str()
    {
        "sim" => (Arc::new(SimPlane::new()), Arc::new(SimNetDev::new())),
        "ovs" => (Arc::new(OvsPlane::new()), Arc::new(IpNetDev::new())),
        other => bail!("Unknown backend '{}', expected 'sim' or 'ovs'", other),
    };

    let policy = Arc::new(AffinityPolicy::new(config.affinity()?));
    let mut topo = Topology::new(plane, netdev, policy);
    config.populate(&mut topo).await?;
    topo.start_all(&[]).await?;

    let spec = MoveSpec {
        host: args.host,
        from: args.from,
        to: args.to,
        port: args.port.map(PortNo::new).transpose()?,
    };
    let outcome = demo::run(&mut topo, &spec, args.json).await;

    // Bring the fabric down even when the scenario failed
    let cleanup = topo.teardown().await;
    outcome?;
    cleanup?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting mobilityd ---");
    info!("Backend: {}", args.backend);

    match run(args).await {
        Ok(()) => {
            info!("mobilityd exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("mobilityd error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
