//! Probe task: one latency measurement against one peer.
//!
//! The task spawns the echo utility, polls it at a fixed interval, and
//! checks the session's cancellation token between polls. Every path ends
//! in exactly one `ProbeResult`; failures are result shapes, never errors.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use peerscout_core::config::ProbeConfig;
use peerscout_core::{hostname, ProbeOutcome, ProbeRequest, ProbeResult};

use crate::cancel::CancellationToken;

/// Matches the statistics line of iputils, BSD and busybox ping and
/// captures the average.
fn rtt_regex() -> &'static Regex {
    static RTT: OnceLock<Regex> = OnceLock::new();
    RTT.get_or_init(|| {
        Regex::new(r"min/avg/max(?:/(?:mdev|stddev))?\s*=\s*[\d.]+/([\d.]+)/")
            .expect("rtt pattern is valid")
    })
}

/// Average round-trip time in whole milliseconds, rounded to nearest.
pub fn parse_average_rtt(output: &str) -> Option<u32> {
    let caps = rtt_regex().captures(output)?;
    let avg: f64 = caps.get(1)?.as_str().parse().ok()?;
    if !avg.is_finite() || avg < 0.0 {
        return None;
    }
    Some(avg.round().min(f64::from(u32::MAX)) as u32)
}

/// How the wait loop ended.
enum Waited {
    Exited(ExitStatus, Vec<u8>),
    Cancelled,
    TimedOut,
    WaitFailed,
}

pub struct ProbeTask {
    request: ProbeRequest,
    config: Arc<ProbeConfig>,
    token: CancellationToken,
}

impl ProbeTask {
    pub fn new(request: ProbeRequest, config: Arc<ProbeConfig>, token: CancellationToken) -> Self {
        Self {
            request,
            config,
            token,
        }
    }

    pub async fn run(self) -> ProbeResult {
        let Self {
            request,
            config,
            token,
        } = self;

        if token.is_cancelled() {
            tracing::debug!(peer = %request.peer.host, "skipping probe, session cancelled");
            return ProbeResult::unsuccessful(request, ProbeOutcome::Cancelled);
        }

        let target = hostname(&request.peer.host);
        if target.is_empty() {
            tracing::debug!(peer = %request.peer.host, "no host in peer uri");
            return ProbeResult::unsuccessful(request, ProbeOutcome::Unparseable);
        }

        let child = Command::new(&config.program)
            .args(config.command_args(&target))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(program = %config.program, error = %e, "failed to spawn probe");
                return ProbeResult::unsuccessful(request, ProbeOutcome::SpawnFailed);
            }
        };

        tracing::debug!(peer = %request.peer.host, target, "probe started");
        let started = Instant::now();

        let result = match wait_for_exit(child, &config, &token).await {
            Waited::Cancelled => ProbeResult::unsuccessful(request, ProbeOutcome::Cancelled),
            Waited::TimedOut => ProbeResult::unsuccessful(request, ProbeOutcome::TimedOut),
            Waited::WaitFailed => ProbeResult::unsuccessful(request, ProbeOutcome::Unreachable),
            Waited::Exited(status, _) if !status.success() => {
                ProbeResult::unsuccessful(request, ProbeOutcome::Unreachable)
            }
            Waited::Exited(_, stdout) => {
                match parse_average_rtt(&String::from_utf8_lossy(&stdout)) {
                    Some(ms) => ProbeResult::measured(request, ms),
                    None => ProbeResult::unsuccessful(request, ProbeOutcome::Unparseable),
                }
            }
        };

        tracing::debug!(
            peer = %result.peer.host,
            outcome = ?result.outcome,
            latency_ms = result.peer.latency_ms(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "probe finished"
        );
        result
    }
}

async fn wait_for_exit(mut child: Child, config: &ProbeConfig, token: &CancellationToken) -> Waited {
    let poll = config.poll_interval();
    let timeout = config.timeout();
    let started = Instant::now();

    // Drain stdout alongside the wait so a full pipe can never stall the child.
    let stdout = child.stdout.take();
    let read_stdout = async move {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout {
            if let Err(e) = out.read_to_end(&mut buf).await {
                tracing::debug!(error = %e, "failed to read probe output");
            }
        }
        buf
    };
    tokio::pin!(read_stdout);
    let mut captured: Option<Vec<u8>> = None;

    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            bytes = &mut read_stdout, if captured.is_none() => {
                captured = Some(bytes);
            }
            _ = tokio::time::sleep(poll) => {
                if token.is_cancelled() {
                    terminate(&mut child, config.grace()).await;
                    return Waited::Cancelled;
                }
                if started.elapsed() >= timeout {
                    tracing::debug!(timeout_ms = timeout.as_millis() as u64, "probe timed out");
                    terminate(&mut child, config.grace()).await;
                    return Waited::TimedOut;
                }
            }
        }
    };

    let status = match status {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to wait on probe");
            terminate(&mut child, config.grace()).await;
            return Waited::WaitFailed;
        }
    };

    let stdout = match captured {
        Some(bytes) => bytes,
        // A grandchild may still hold the pipe open; don't wait on it forever.
        None => tokio::time::timeout(config.grace().max(poll), read_stdout)
            .await
            .unwrap_or_default(),
    };

    Waited::Exited(status, stdout)
}

/// SIGTERM, wait up to `grace`, then SIGKILL.
async fn terminate(child: &mut Child, grace: Duration) {
    if let Some(pid) = child.id() {
        // SAFETY: `pid` is our own child and has not been reaped (id() is Some).
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc == 0 {
            if let Ok(Ok(_)) = tokio::time::timeout(grace, child.wait()).await {
                return;
            }
        }
    }
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "probe already gone");
    }
}
