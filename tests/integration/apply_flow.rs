use std::path::{Path, PathBuf};

use peerscout_core::config::ApplyConfig;
use peerscout_core::{csv, PeerRecord};
use peerscout_services::{ApplyError, PeerApplier, SystemRunner, TestSession};

use crate::*;

/// Run one full round over `list` and return the tested peers.
async fn tested(list: Vec<PeerRecord>) -> Vec<PeerRecord> {
    let mut config = probe_config(&mixed_script(), 3);
    config.timeout_ms = 400;
    let mut session = TestSession::new(config);
    session.load(list);
    tokio::time::timeout(DEADLINE, session.run_round(std::future::pending(), |_, _| {}))
        .await
        .expect("round completes");
    session.finish().await.peers().to_vec()
}

/// Update script stand-in. `env` plays the elevation wrapper, so the command
/// line is `env sh <script> <peers file>`.
fn apply_config(dir: &Path, body: &str) -> ApplyConfig {
    let script = dir.join("update-peers.sh");
    std::fs::write(&script, body).unwrap();
    ApplyConfig {
        elevate: "env".into(),
        script_path: script,
        timeout_secs: 5,
        ..ApplyConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_export_after_round() {
    let mut peers = tested(vec![peer(ANSWERS, 0), peer(UNREACHABLE, 0)]).await;
    peers.push(PeerRecord::new("tcp://10.9.9.9:1"));

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("peers.csv");
    csv::export_csv(&file, &peers).unwrap();

    let text = std::fs::read_to_string(&file).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "\"Host\",\"Latency (ms)\",\"Valid\"",
            "\"tcp://10.9.1.0:1\",\"8\",\"Valid\"",
            "\"tcp://10.9.2.0:1\",\"Failed\",\"Invalid\"",
            "\"tcp://10.9.9.9:1\",\"Not Tested\",\"\"",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_apply_hands_sorted_valid_peers_to_script() {
    let dir = tempfile::tempdir().unwrap();
    let captured: PathBuf = dir.path().join("captured.txt");
    let config = apply_config(
        dir.path(),
        &format!(
            "cp \"$1\" '{}'\necho 'Peers updated successfully'\nexit 1\n",
            captured.display()
        ),
    );

    let peers = tested(vec![
        peer(UNREACHABLE, 0),
        peer(ANSWERS, 0),
        peer(GARBLED, 0),
        peer(ANSWERS, 1),
    ])
    .await;

    let report = PeerApplier::new(SystemRunner, config)
        .apply(&peers)
        .await
        .expect("exit 1 with the success marker counts as success");
    assert!(!report.fell_back);
    assert_eq!(report.output, "Peers updated successfully");

    let written = std::fs::read_to_string(&captured).unwrap();
    assert_eq!(written, "tcp://10.9.1.0:1\ntcp://10.9.1.1:1\n");
}

#[tokio::test]
async fn test_apply_failure_carries_script_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let config = apply_config(dir.path(), "echo 'peers file rejected' >&2\nexit 2\n");
    let selection = vec![PeerRecord::new("tcp://10.9.1.0:1")];

    match PeerApplier::new(SystemRunner, config).apply(&selection).await {
        Err(ApplyError::Failed { code, diagnostic }) => {
            assert_eq!(code, 2);
            assert_eq!(diagnostic, "peers file rejected");
        }
        other => panic!("expected script failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_apply_script_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let config = ApplyConfig {
        timeout_secs: 1,
        ..apply_config(dir.path(), "exec sleep 10\n")
    };
    let selection = vec![PeerRecord::new("tcp://10.9.1.0:1")];

    let result = PeerApplier::new(SystemRunner, config).apply(&selection).await;
    assert!(matches!(result, Err(ApplyError::TimedOut(_))));
}
