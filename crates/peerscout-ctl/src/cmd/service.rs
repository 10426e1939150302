//! `service status|start|stop|enable`.

use anyhow::{bail, Context, Result};

use peerscout_core::PeerscoutConfig;
use peerscout_services::{ServiceAction, ServiceManager, SystemRunner};

fn manager(config: &PeerscoutConfig) -> ServiceManager<SystemRunner> {
    ServiceManager::new(SystemRunner, &config.service.name, &config.apply.elevate)
}

pub async fn cmd_status(config: &PeerscoutConfig) -> Result<()> {
    let manager = manager(config);
    let running = manager
        .is_running()
        .await
        .context("failed to query systemd")?;
    let state = if running { "running" } else { "not running" };
    println!("{}: {state}", manager.name());
    Ok(())
}

pub async fn cmd_control(config: &PeerscoutConfig, action: &str) -> Result<()> {
    let action = match action {
        "start" => ServiceAction::Start,
        "stop" => ServiceAction::Stop,
        "enable" => ServiceAction::Enable,
        other => bail!("unknown service action '{other}' (expected status, start, stop or enable)"),
    };
    let manager = manager(config);
    manager.control(action).await?;
    println!("{}: {action} done", manager.name());
    Ok(())
}
