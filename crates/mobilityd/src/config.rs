//! Declarative topology descriptions.
//!
//! A description names the controllers, the switches with their domain
//! bindings, the hosts, and the links. It can be loaded from a JSON
//! file or generated as the built-in evaluation chain.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use mobinet_topo::{ControllerAffinityMap, Topology};
use mobinet_types::ControllerEndpoint;

/// A named controller that switch domains can bind to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl ControllerConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }
}

/// A switch and the controller domain it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchConfig {
    pub name: String,
    /// Name of an entry in the `controllers` list.
    pub controller: String,
}

/// Full topology description.
///
/// File format:
/// ```json
/// {
///   "controllers": [
///     { "name": "c0", "host": "192.168.56.101", "port": 6633 }
///   ],
///   "switches": [
///     { "name": "s1", "controller": "c0" }
///   ],
///   "hosts": ["h1"],
///   "links": [["s1", "h1"]]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopoConfig {
    pub controllers: Vec<ControllerConfig>,
    pub switches: Vec<SwitchConfig>,
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub links: Vec<(String, String)>,
}

impl TopoConfig {
    /// Loads a description from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open topology file {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse topology file {}", path.display()))?;
        info!(
            controllers = config.controllers.len(),
            switches = config.switches.len(),
            hosts = config.hosts.len(),
            links = config.links.len(),
            "Loaded topology description from {}",
            path.display()
        );
        Ok(config)
    }

    /// Built-in description: a 17-switch chain with one host per switch.
    ///
    /// Switches come in domains of four, bound to controllers c0 through
    /// c3. A root controller c4 coordinates across domains and is never
    /// bound to a switch directly.
    pub fn default_chain() -> Self {
        let controllers = vec![
            ControllerConfig::new("c0", "192.168.56.101", 6633),
            ControllerConfig::new("c1", "192.168.56.102", 6634),
            ControllerConfig::new("c2", "192.168.56.103", 6635),
            ControllerConfig::new("c3", "192.168.56.104", 6636),
            ControllerConfig::new("c4", "127.0.0.1", 6637),
        ];

        let mut switches = Vec::new();
        let mut hosts = Vec::new();
        let mut links = Vec::new();
        for i in 1..=17u32 {
            let switch = format!("s{i}");
            let controller = match i {
                1..=4 => "c0",
                5..=8 => "c1",
                9..=12 => "c2",
                _ => "c3",
            };
            switches.push(SwitchConfig {
                name: switch.clone(),
                controller: controller.to_string(),
            });
            let host = format!("h{i}");
            links.push((switch, host.clone()));
            hosts.push(host);
        }
        for i in 1..17u32 {
            links.push((format!("s{i}"), format!("s{}", i + 1)));
        }

        Self {
            controllers,
            switches,
            hosts,
            links,
        }
    }

    /// Resolves the per-switch controller bindings.
    pub fn affinity(&self) -> Result<ControllerAffinityMap> {
        let mut map = ControllerAffinityMap::new();
        for sw in &self.switches {
            let ctrl = self
                .controllers
                .iter()
                .find(|c| c.name == sw.controller)
                .with_context(|| {
                    format!(
                        "Switch '{}' references unknown controller '{}'",
                        sw.name, sw.controller
                    )
                })?;
            let endpoint = ControllerEndpoint::new(ctrl.host.clone(), ctrl.port)
                .with_context(|| format!("Controller '{}' has an invalid endpoint", ctrl.name))?;
            map.insert(&sw.name, endpoint);
        }
        Ok(map)
    }

    /// Adds the described nodes and links to an empty topology.
    pub async fn populate(&self, topo: &mut Topology) -> Result<()> {
        for sw in &self.switches {
            topo.add_switch(&sw.name)?;
        }
        for host in &self.hosts {
            topo.add_host(host)?;
        }
        for (a, b) in &self.links {
            topo.add_link(a, b).await?;
        }
        info!(
            switches = topo.switch_count(),
            hosts = topo.host_count(),
            links = topo.link_count(),
            "Topology populated"
        );
        Ok(())
    }
}
