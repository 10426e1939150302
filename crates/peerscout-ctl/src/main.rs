//! peerscout-ctl: discover, test and apply mesh peers from the command line.

use std::path::PathBuf;

use anyhow::{Context, Result};

use peerscout_core::PeerscoutConfig;

mod cmd;

fn print_usage() {
    println!("Usage: peerscout-ctl [--config <path>] <command>");
    println!();
    println!("Commands:");
    println!("  discover                    Fetch and list public peers");
    println!("  test [--concurrency N]      Discover and probe every peer (Ctrl-C cancels)");
    println!("  export <file.csv>           Discover, probe, and write results as CSV");
    println!("  apply [host ...]            Discover, probe, and apply the best peers");
    println!("  service status              Show whether the mesh daemon is running");
    println!("  service start|stop|enable   Control the mesh daemon (elevated)");
    println!("  address                     Print this node's mesh address");
    println!("  config init                 Write the default config file");
    println!();
    println!("Options:");
    println!("  --config <path>   Config file (default: $PEERSCOUT_CONFIG or ~/.config/peerscout/config.toml)");
}

fn load_config(path: &std::path::Path) -> PeerscoutConfig {
    PeerscoutConfig::load_from(path).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        PeerscoutConfig::default()
    })
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    let mut concurrency: Option<usize> = None;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                config_path = Some(args.get(i).context("--config requires a value")?.into());
            }
            "--concurrency" => {
                i += 1;
                concurrency = Some(
                    args.get(i)
                        .context("--concurrency requires a value")?
                        .parse()
                        .context("--concurrency must be a number")?,
                );
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    let config_path = config_path.unwrap_or_else(PeerscoutConfig::file_path);
    if remaining.as_slice() == ["config", "init"] {
        return cmd::config::cmd_config_init(&config_path);
    }

    let mut config = load_config(&config_path);
    if let Some(n) = concurrency {
        config.probe.concurrency = n;
    }

    match remaining.as_slice() {
        ["discover"] => cmd::peers::cmd_discover(&config).await,
        ["test"] => cmd::peers::cmd_test(&config).await,
        ["export", file] => cmd::peers::cmd_export(&config, std::path::Path::new(file)).await,
        ["apply", hosts @ ..] => {
            let hosts: Vec<String> = hosts.iter().map(|h| h.to_string()).collect();
            cmd::peers::cmd_apply(&config, &hosts).await
        }
        ["service", "status"] | ["service"] => cmd::service::cmd_status(&config).await,
        ["service", action] => cmd::service::cmd_control(&config, action).await,
        ["address"] => cmd::address::cmd_address(&config).await,
        [] | ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
