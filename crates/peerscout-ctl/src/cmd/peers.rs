//! Peer commands: discover, test, export, apply.

use std::path::Path;

use anyhow::{bail, Context, Result};

use peerscout_core::{csv, sorted_by_quality, PeerRecord, PeerscoutConfig};
use peerscout_services::{
    PeerApplier, PeerDirectory, PeerResultAggregator, RoundSummary, SystemRunner, TestSession,
};

use super::table::{banner, print_peers};

async fn discover(config: &PeerscoutConfig) -> Result<Vec<PeerRecord>> {
    let directory = PeerDirectory::new(&config.discovery)?;
    let peers = directory
        .fetch()
        .await
        .with_context(|| format!("peer discovery from {} failed", config.discovery.url))?;
    if peers.is_empty() {
        bail!("no peers found at {}", config.discovery.url);
    }
    Ok(peers)
}

/// Discover, then probe every peer once. Ctrl-C cancels the round: running
/// probes are terminated and queued ones dropped.
async fn discover_and_test(
    config: &PeerscoutConfig,
) -> Result<(PeerResultAggregator, RoundSummary)> {
    let peers = discover(config).await?;
    let total = peers.len();

    let mut session = TestSession::new(config.probe.clone());
    session.load(peers);

    println!(
        "Testing {total} peers ({} at a time, Ctrl-C to cancel)...",
        config.probe.workers()
    );
    let cancel = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
        } else {
            std::future::pending::<()>().await;
        }
    };
    let summary = session
        .run_round(cancel, |peers, result| {
            println!(
                "  [{:>3}/{}] {:>10}  {}",
                peers.tested_count(),
                total,
                result.peer.latency.to_string(),
                result.peer.host
            );
        })
        .await;

    Ok((session.finish().await, summary))
}

fn print_summary(summary: &RoundSummary) {
    println!();
    println!("  Tested    : {}/{}", summary.tested, summary.submitted);
    println!("  Reachable : {}", summary.valid);
    if summary.cancelled {
        println!("  Cancelled : {} probe(s) never started", summary.discarded);
    }
}

pub async fn cmd_discover(config: &PeerscoutConfig) -> Result<()> {
    let peers = discover(config).await?;
    print_peers(&format!("Discovered Peers ({})", peers.len()), &peers);
    Ok(())
}

pub async fn cmd_test(config: &PeerscoutConfig) -> Result<()> {
    let (peers, summary) = discover_and_test(config).await?;
    println!();
    print_peers("Peers by latency", &sorted_by_quality(peers.peers()));
    print_summary(&summary);
    Ok(())
}

pub async fn cmd_export(config: &PeerscoutConfig, file: &Path) -> Result<()> {
    let (peers, summary) = discover_and_test(config).await?;
    csv::export_csv(file, peers.peers())
        .with_context(|| format!("failed to write {}", file.display()))?;
    print_summary(&summary);
    println!("\nExported {} peers to {}.", peers.peers().len(), file.display());
    Ok(())
}

pub async fn cmd_apply(config: &PeerscoutConfig, hosts: &[String]) -> Result<()> {
    let (peers, summary) = discover_and_test(config).await?;
    print_summary(&summary);
    if summary.cancelled {
        bail!("test round cancelled; configuration left unchanged");
    }

    for host in hosts {
        if peers.get(host).is_none() {
            tracing::warn!(peer = %host, "requested peer was not discovered, skipping");
        }
    }
    let selection = peers.select(hosts);

    let applier = PeerApplier::new(SystemRunner, config.apply.clone());
    let report = applier
        .apply(&selection)
        .await
        .context("failed to update the mesh daemon's peer configuration")?;

    println!();
    banner(&format!("Applied {} peer(s)", report.hosts.len()));
    if report.fell_back {
        println!("  No peer answered; wrote the whole selection.");
    }
    for host in report.hosts.iter().take(config.apply.max_peers) {
        println!("  {host}");
    }
    if report.hosts.len() > config.apply.max_peers {
        println!(
            "  ({} more written; the update script keeps the first {})",
            report.hosts.len() - config.apply.max_peers,
            config.apply.max_peers
        );
    }
    if !report.output.is_empty() {
        println!("\n{}", report.output);
    }
    Ok(())
}
