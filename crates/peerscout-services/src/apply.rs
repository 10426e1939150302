//! Config writer: hands a quality-sorted peer list to the privileged
//! update script.
//!
//! The selection is sorted (measured peers first, fastest first), written
//! one host per line to a temp file, and passed to
//! `<elevate> sh <script> [--verbose] <file>`. Only valid peers are written
//! unless none are valid, in which case the whole selection is.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use peerscout_core::config::ApplyConfig;
use peerscout_core::{sorted_by_quality, PeerRecord};

use crate::process::{ProcessError, ProcessRunner};

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("no peers selected")]
    NoPeers,
    #[error("failed to write peer list: {0}")]
    PeerFile(#[source] std::io::Error),
    #[error("update script timed out after {0:?}")]
    TimedOut(Duration),
    #[error("failed to start update script: {0}")]
    Spawn(#[source] ProcessError),
    #[error("update script failed with exit code {code}: {diagnostic}")]
    Failed { code: i32, diagnostic: String },
}

/// What was handed to the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Hosts in the order written.
    pub hosts: Vec<String>,
    /// True when no peer was valid and the whole selection was written.
    pub fell_back: bool,
    pub output: String,
}

/// Hosts to write, in order, and whether the all-peers fallback was used.
pub fn peer_list(selection: &[PeerRecord]) -> (Vec<String>, bool) {
    let sorted = sorted_by_quality(selection);
    let valid: Vec<String> = sorted
        .iter()
        .filter(|p| p.is_valid())
        .map(|p| p.host.clone())
        .collect();
    if valid.is_empty() {
        (sorted.into_iter().map(|p| p.host).collect(), true)
    } else {
        (valid, false)
    }
}

pub struct PeerApplier<R> {
    runner: R,
    config: ApplyConfig,
}

impl<R: ProcessRunner> PeerApplier<R> {
    pub fn new(runner: R, config: ApplyConfig) -> Self {
        Self { runner, config }
    }

    /// Full argument list passed to the elevation wrapper.
    pub fn script_args(&self, peers_file: &Path) -> Vec<String> {
        let mut args = vec![
            "sh".to_string(),
            self.config.script_path.display().to_string(),
        ];
        if self.config.verbose {
            args.push("--verbose".to_string());
        }
        args.push(peers_file.display().to_string());
        args
    }

    pub async fn apply(&self, selection: &[PeerRecord]) -> Result<ApplyReport, ApplyError> {
        if selection.is_empty() {
            return Err(ApplyError::NoPeers);
        }

        let (hosts, fell_back) = peer_list(selection);
        if fell_back {
            tracing::warn!(peers = hosts.len(), "no valid peers, writing whole selection");
        }
        tracing::info!(
            peers = hosts.len(),
            max_peers = self.config.max_peers,
            "writing peer list for update script"
        );

        // Removed when dropped, on every return path below.
        let mut peers_file = tempfile::Builder::new()
            .prefix("peerscout-peers-")
            .suffix(".txt")
            .tempfile()
            .map_err(ApplyError::PeerFile)?;
        for host in &hosts {
            writeln!(peers_file, "{host}").map_err(ApplyError::PeerFile)?;
        }
        peers_file.flush().map_err(ApplyError::PeerFile)?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let args = self.script_args(peers_file.path());
        let output = match self.runner.run(&self.config.elevate, &args, timeout).await {
            Ok(out) => out,
            Err(ProcessError::TimedOut { .. }) => return Err(ApplyError::TimedOut(timeout)),
            Err(e) => return Err(ApplyError::Spawn(e)),
        };

        let marker = self.config.success_marker.as_str();
        let reported_success = !marker.is_empty()
            && (output.stdout.contains(marker) || output.stderr.contains(marker));

        match output.code {
            Some(0) => {}
            // The script exits 1 after a successful update on some systems.
            Some(1) if reported_success => {
                tracing::info!("update script exited 1 but reported success");
            }
            code => {
                let code = code.unwrap_or(-1);
                let diagnostic = output.diagnostic().to_string();
                tracing::error!(code, diagnostic = %diagnostic, "update script failed");
                return Err(ApplyError::Failed { code, diagnostic });
            }
        }

        tracing::info!(peers = hosts.len(), "peer configuration updated");
        Ok(ApplyReport {
            hosts,
            fell_back,
            output: output.stdout.trim().to_string(),
        })
    }
}
