//! peerscout integration test harness.
//!
//! Drives the probe pool, test sessions and the apply step end to end with
//! real subprocesses. `sh` scripts stand in for the echo utility and the
//! update script, so no network access or privileges are needed:
//!
//!   cargo test --test integration
//!
//! The probe script receives the bare host as `$1`. Hosts are shaped
//! `tcp://10.9.<kind>.<n>:1` so a script can pick its behavior from the
//! third octet.

use std::time::Duration;

use peerscout_core::config::ProbeConfig;
use peerscout_core::PeerRecord;

mod apply_flow;
mod pool;
mod rounds;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Statistics line in iputils format.
pub const STATS: &str = "rtt min/avg/max/mdev = 0.9/7.6/12.1/2.0 ms";

/// Third octet selects the fake probe's behavior.
pub const ANSWERS: u8 = 1;
pub const UNREACHABLE: u8 = 2;
pub const HANGS: u8 = 3;
pub const GARBLED: u8 = 4;

/// Probe script covering every outcome, keyed by the host's third octet.
pub fn mixed_script() -> String {
    format!(
        "case \"$1\" in \
           10.9.{ANSWERS}.*) echo '{STATS}';; \
           10.9.{UNREACHABLE}.*) echo '100% packet loss'; exit 1;; \
           10.9.{HANGS}.*) exec sleep 30;; \
           10.9.{GARBLED}.*) echo 'no statistics here';; \
         esac"
    )
}

/// Probe config running `sh -c <script> probe <host>`.
pub fn probe_config(script: &str, concurrency: usize) -> ProbeConfig {
    ProbeConfig {
        program: "sh".into(),
        args: vec!["-c".into(), script.into(), "probe".into()],
        concurrency,
        poll_interval_ms: 25,
        timeout_ms: 5_000,
        grace_ms: 200,
        ..ProbeConfig::default()
    }
}

pub fn peer(kind: u8, n: usize) -> PeerRecord {
    PeerRecord::new(format!("tcp://10.9.{kind}.{n}:1"))
}

pub fn peers(kind: u8, count: usize) -> Vec<PeerRecord> {
    (0..count).map(|n| peer(kind, n)).collect()
}

/// Upper bound for any single test step.
pub const DEADLINE: Duration = Duration::from_secs(20);

// ── Harness self-checks ───────────────────────────────────────────────────────

#[test]
fn test_sh_available() {
    let status = std::process::Command::new("sh")
        .args(["-c", "exit 0"])
        .status()
        .expect("sh must be installed to run the integration tests");
    assert!(status.success());
}

#[test]
fn test_peer_hosts_parse() {
    assert_eq!(peerscout_core::hostname(&peer(HANGS, 7).host), "10.9.3.7");
}
