//! `address`: the node's own mesh address via the admin socket.

use anyhow::{Context, Result};

use peerscout_core::PeerscoutConfig;
use peerscout_services::AdminSocket;

pub async fn cmd_address(config: &PeerscoutConfig) -> Result<()> {
    let address = AdminSocket::new(&config.admin)
        .self_address()
        .await
        .context("failed to query the mesh daemon admin socket (is it running?)")?;
    println!("{address}");
    Ok(())
}
