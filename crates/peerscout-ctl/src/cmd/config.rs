//! `config init`.

use std::path::Path;

use anyhow::{Context, Result};

use peerscout_core::PeerscoutConfig;

pub fn cmd_config_init(path: &Path) -> Result<()> {
    let existed = path.exists();
    let path = PeerscoutConfig::write_default_if_missing(path)
        .with_context(|| format!("failed to write default config to {}", path.display()))?;
    if existed {
        println!("Config already exists at {}; left unchanged.", path.display());
    } else {
        println!("Wrote default config to {}.", path.display());
    }
    Ok(())
}
