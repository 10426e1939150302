//! Test session: ties the probe pool to the aggregator and runs rounds.
//!
//! A round resets the pool, submits one request per listed peer, and folds
//! results into the aggregator until every submitted request has reported.
//! A cancel signal discards the queued requests and lets the in-flight ones
//! report as cancelled, so the round still terminates.

use std::future::Future;

use peerscout_core::config::ProbeConfig;
use peerscout_core::{PeerRecord, ProbeResult};

use crate::aggregator::{Applied, PeerResultAggregator};
use crate::pool::{ProbePool, ResultReceiver};

/// Counts reported at the end of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    pub submitted: usize,
    pub tested: usize,
    pub valid: usize,
    /// Queued requests dropped by a cancel.
    pub discarded: usize,
    pub cancelled: bool,
}

pub struct TestSession {
    pool: ProbePool,
    results: ResultReceiver,
    peers: PeerResultAggregator,
}

impl TestSession {
    pub fn new(config: ProbeConfig) -> Self {
        let (pool, results) = ProbePool::new(config);
        Self {
            pool,
            results,
            peers: PeerResultAggregator::new(),
        }
    }

    /// Replace the canonical list.
    pub fn load(&mut self, peers: Vec<PeerRecord>) {
        self.peers.replace(peers);
    }

    pub fn peers(&self) -> &PeerResultAggregator {
        &self.peers
    }

    /// Probe every listed peer. `on_result` runs after each accepted result
    /// with the aggregator already updated.
    pub async fn run_round<C, F>(&mut self, cancel: C, mut on_result: F) -> RoundSummary
    where
        C: Future<Output = ()>,
        F: FnMut(&PeerResultAggregator, &ProbeResult),
    {
        self.pool.reset_for_new_session().await;

        let requests = self.peers.begin_round();
        let submitted = requests.len();
        tracing::info!(peers = submitted, round = self.peers.round(), "test round started");
        for request in requests {
            self.pool.submit(request);
        }

        tokio::pin!(cancel);
        let mut cancelled = false;
        let mut discarded = 0;

        while !self.peers.is_complete() {
            tokio::select! {
                _ = &mut cancel, if !cancelled => {
                    cancelled = true;
                    discarded = self.pool.cancel_all();
                    self.peers.abandon(discarded);
                }
                result = self.results.recv() => {
                    let Some(result) = result else {
                        tracing::warn!("probe pool closed mid-round");
                        break;
                    };
                    if self.peers.apply(&result) == Applied::Updated {
                        on_result(&self.peers, &result);
                    }
                }
            }
        }

        let summary = RoundSummary {
            submitted,
            tested: self.peers.tested_count(),
            valid: self.peers.peers().iter().filter(|p| p.is_valid()).count(),
            discarded,
            cancelled,
        };
        tracing::info!(
            tested = summary.tested,
            valid = summary.valid,
            discarded = summary.discarded,
            cancelled = summary.cancelled,
            "test round finished"
        );
        summary
    }

    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }

    /// Shut the pool down and hand back the tested list.
    pub async fn finish(self) -> PeerResultAggregator {
        self.pool.shutdown().await;
        self.peers
    }
}
