//! Kernel link operations via ip(8).

use async_trait::async_trait;
use tracing::debug;

use crate::commands;
use crate::error::PlaneResult;
use crate::plane::NetDev;
use crate::shell;

/// [`NetDev`] backed by the `ip` command on the local host.
#[derive(Debug, Default)]
pub struct IpNetDev;

impl IpNetDev {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NetDev for IpNetDev {
    async fn link_up(&self, dev: &str) -> PlaneResult<()> {
        shell::exec_or_throw(&commands::build_link_up_cmd(dev)).await?;
        Ok(())
    }

    async fn link_down(&self, dev: &str) -> PlaneResult<()> {
        shell::exec_or_throw(&commands::build_link_down_cmd(dev)).await?;
        Ok(())
    }

    async fn rename(&self, old: &str, new: &str) -> PlaneResult<()> {
        debug!(old = %old, new = %new, "Renaming link");
        shell::exec_or_throw(&commands::build_link_rename_cmd(old, new)).await?;
        Ok(())
    }

    async fn create_veth_pair(&self, a: &str, b: &str) -> PlaneResult<()> {
        debug!(a = %a, b = %b, "Creating veth pair");
        shell::exec_or_throw(&commands::build_veth_add_cmd(a, b)).await?;
        Ok(())
    }

    async fn delete_link(&self, dev: &str) -> PlaneResult<()> {
        shell::exec_or_throw(&commands::build_link_del_cmd(dev)).await?;
        Ok(())
    }
}
