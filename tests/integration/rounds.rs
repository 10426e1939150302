use std::time::Duration;

use peerscout_core::{Latency, ProbeRequest};
use peerscout_services::{Applied, PeerResultAggregator, ProbePool, TestSession};

use crate::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_round_merges_results_in_discovery_order() {
    let mut config = probe_config(&mixed_script(), 3);
    config.timeout_ms = 400;
    let mut session = TestSession::new(config);

    let list = vec![
        peer(UNREACHABLE, 0),
        peer(ANSWERS, 0),
        peer(HANGS, 0),
        peer(GARBLED, 0),
        peer(ANSWERS, 1),
    ];
    let order: Vec<String> = list.iter().map(|p| p.host.clone()).collect();
    session.load(list);

    let mut progress = Vec::new();
    let summary = tokio::time::timeout(
        DEADLINE,
        session.run_round(std::future::pending(), |peers, _| {
            progress.push(peers.tested_count())
        }),
    )
    .await
    .expect("round completes");

    assert_eq!(progress, [1, 2, 3, 4, 5]);
    assert_eq!(summary.tested, 5);
    assert_eq!(summary.valid, 2);

    let peers = session.finish().await;
    let hosts: Vec<String> = peers.peers().iter().map(|p| p.host.clone()).collect();
    assert_eq!(hosts, order, "testing must not reorder the list");
    let latencies: Vec<Latency> = peers.peers().iter().map(|p| p.latency).collect();
    assert_eq!(
        latencies,
        [
            Latency::Failed,
            Latency::Measured(8),
            Latency::Failed,
            Latency::Failed,
            Latency::Measured(8),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancelled_round_then_new_list() {
    let mut session = TestSession::new(probe_config(&mixed_script(), 2));
    session.load(peers(HANGS, 8));

    let summary = tokio::time::timeout(
        DEADLINE,
        session.run_round(tokio::time::sleep(Duration::from_millis(300)), |_, _| {}),
    )
    .await
    .expect("cancelled round converges");
    assert!(summary.cancelled);
    assert_eq!(summary.tested + summary.discarded, 8);
    assert_eq!(summary.valid, 0);
    assert!(session.peers().peers().iter().all(|p| !p.is_tested()));

    session.load(peers(ANSWERS, 4));
    let summary = tokio::time::timeout(
        DEADLINE,
        session.run_round(std::future::pending(), |_, _| {}),
    )
    .await
    .expect("second round completes");
    assert!(!summary.cancelled);
    assert_eq!(summary.tested, 4);
    assert_eq!(summary.valid, 4);
    session.shutdown().await;
}

/// Results for a list that was replaced mid-round never touch the new list.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_results_for_replaced_list_are_dropped() {
    let (pool, mut rx) = ProbePool::new(probe_config(&mixed_script(), 4));
    let mut aggregator = PeerResultAggregator::new();
    aggregator.replace(peers(ANSWERS, 4));
    let requests: Vec<ProbeRequest> = aggregator.begin_round();
    for request in requests {
        pool.submit(request);
    }

    aggregator.replace(peers(ANSWERS, 2));
    for _ in 0..4 {
        let result = tokio::time::timeout(DEADLINE, rx.recv())
            .await
            .expect("result before deadline")
            .expect("channel open");
        assert_eq!(aggregator.apply(&result), Applied::Stale);
    }
    assert_eq!(aggregator.tested_count(), 0);
    assert!(aggregator.peers().iter().all(|p| !p.is_tested()));
    pool.shutdown().await;
}
