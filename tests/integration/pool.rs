use std::collections::HashSet;
use std::time::{Duration, Instant};

use peerscout_core::{Latency, PeerRecord, ProbeOutcome, ProbeRequest, ProbeResult};
use peerscout_services::{ProbePool, ResultReceiver};

use crate::*;

fn request(peer: PeerRecord) -> ProbeRequest {
    ProbeRequest { peer, round: 1 }
}

async fn collect(rx: &mut ResultReceiver, n: usize) -> Vec<ProbeResult> {
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let result = tokio::time::timeout(DEADLINE, rx.recv())
            .await
            .expect("result before deadline")
            .expect("result channel open");
        out.push(result);
    }
    out
}

async fn wait_for_in_flight(pool: &ProbePool, n: usize) {
    let start = Instant::now();
    while pool.in_flight() < n {
        assert!(start.elapsed() < DEADLINE, "probes never started");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Every outcome shape comes back exactly once per submitted request.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exactly_one_result_per_request() {
    let mut config = probe_config(&mixed_script(), 3);
    config.timeout_ms = 400;
    let (pool, mut rx) = ProbePool::new(config);

    let mut submitted = Vec::new();
    for kind in [ANSWERS, UNREACHABLE, HANGS, GARBLED] {
        submitted.extend(peers(kind, 2));
    }
    submitted.push(PeerRecord::new("invalidstring"));
    for peer in &submitted {
        pool.submit(request(peer.clone()));
    }

    let results = collect(&mut rx, submitted.len()).await;
    let hosts: HashSet<_> = results.iter().map(|r| r.peer.host.clone()).collect();
    assert_eq!(hosts.len(), submitted.len(), "duplicate or missing result");

    for result in &results {
        let host = result.peer.host.as_str();
        let expected = if host == "invalidstring" {
            ProbeOutcome::Unparseable
        } else if host.starts_with(&format!("tcp://10.9.{ANSWERS}.")) {
            ProbeOutcome::Reachable
        } else if host.starts_with(&format!("tcp://10.9.{UNREACHABLE}.")) {
            ProbeOutcome::Unreachable
        } else if host.starts_with(&format!("tcp://10.9.{HANGS}.")) {
            ProbeOutcome::TimedOut
        } else {
            ProbeOutcome::Unparseable
        };
        assert_eq!(result.outcome, expected, "{host}");
        let latency = if expected == ProbeOutcome::Reachable {
            Latency::Measured(8)
        } else {
            Latency::Failed
        };
        assert_eq!(result.peer.latency, latency, "{host}");
    }

    pool.wait_idle().await;
    assert!(rx.try_recv().is_err(), "no extra results after the batch");
    pool.shutdown().await;
}

#[tokio::test]
async fn test_missing_probe_program_fails_each_peer() {
    let mut config = probe_config("", 2);
    config.program = "/nonexistent/peerscout-ping".into();
    let (pool, mut rx) = ProbePool::new(config);
    for peer in peers(ANSWERS, 3) {
        pool.submit(request(peer));
    }
    for result in collect(&mut rx, 3).await {
        assert_eq!(result.outcome, ProbeOutcome::SpawnFailed);
        assert_eq!(result.peer.latency, Latency::Failed);
    }
    pool.shutdown().await;
}

/// Cancel stops running probes within one poll plus the grace period and
/// drops everything still queued.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_discards_queue_and_stops_running() {
    let (pool, mut rx) = ProbePool::new(probe_config(&mixed_script(), 2));
    for peer in peers(HANGS, 6) {
        pool.submit(request(peer));
    }
    wait_for_in_flight(&pool, 2).await;

    let cancelled_at = Instant::now();
    assert_eq!(pool.cancel_all(), 4);
    assert_eq!(pool.queued(), 0);

    let results = collect(&mut rx, 2).await;
    assert!(
        cancelled_at.elapsed() < Duration::from_secs(2),
        "cancellation took {:?}",
        cancelled_at.elapsed()
    );
    for result in &results {
        assert_eq!(result.outcome, ProbeOutcome::Cancelled);
        assert_eq!(result.peer.latency, Latency::NotTested);
    }

    pool.wait_idle().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err(), "discarded requests must not report");
    pool.shutdown().await;
}

/// Resetting twice in a row is the same as resetting once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reset_after_cancel_is_idempotent() {
    let (pool, mut rx) = ProbePool::new(probe_config(&mixed_script(), 2));
    for peer in peers(HANGS, 3) {
        pool.submit(request(peer));
    }
    wait_for_in_flight(&pool, 2).await;
    pool.cancel_all();
    collect(&mut rx, 2).await;

    pool.reset_for_new_session().await;
    pool.reset_for_new_session().await;
    assert!(!pool.is_cancelled());

    for peer in peers(ANSWERS, 4) {
        pool.submit(request(peer));
    }
    for result in collect(&mut rx, 4).await {
        assert_eq!(result.outcome, ProbeOutcome::Reachable);
    }
    pool.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_mid_batch_reaps_and_closes() {
    let (pool, mut rx) = ProbePool::new(probe_config(&mixed_script(), 2));
    for peer in peers(HANGS, 5) {
        pool.submit(request(peer));
    }
    wait_for_in_flight(&pool, 2).await;

    tokio::time::timeout(DEADLINE, pool.shutdown())
        .await
        .expect("shutdown completes");

    let mut reported = 0;
    while let Some(result) = rx.recv().await {
        assert_eq!(result.outcome, ProbeOutcome::Cancelled);
        reported += 1;
    }
    assert_eq!(reported, 2);
}
