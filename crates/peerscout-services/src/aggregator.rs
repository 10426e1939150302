//! Peer result aggregator: the canonical peer list and round bookkeeping.
//!
//! The list keeps discovery order and is unique by host. Results are matched
//! by host and round; anything that does not match the current list and
//! round is stale and dropped. Only the consumer side of the pool's result
//! channel touches this type.

use std::collections::HashMap;

use peerscout_core::{Latency, PeerRecord, ProbeRequest, ProbeResult};

/// What `apply` did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// Host not in the list, or the result belongs to an earlier round.
    Stale,
}

#[derive(Debug, Default)]
pub struct PeerResultAggregator {
    peers: Vec<PeerRecord>,
    index: HashMap<String, usize>,
    round: u64,
    tested: usize,
    total: usize,
}

impl PeerResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly discovered list. Duplicate hosts keep their first
    /// position. Results still in flight for the previous list become stale.
    pub fn replace(&mut self, peers: impl IntoIterator<Item = PeerRecord>) {
        self.peers.clear();
        self.index.clear();
        for peer in peers {
            if self.index.contains_key(&peer.host) {
                continue;
            }
            self.index.insert(peer.host.clone(), self.peers.len());
            self.peers.push(peer);
        }
        self.round += 1;
        self.tested = 0;
        self.total = 0;
        tracing::debug!(peers = self.peers.len(), round = self.round, "peer list replaced");
    }

    /// Start a test round over the whole list: every entry goes back to
    /// not tested and one request per peer is returned for submission.
    pub fn begin_round(&mut self) -> Vec<ProbeRequest> {
        self.round += 1;
        self.tested = 0;
        self.total = self.peers.len();
        for peer in &mut self.peers {
            peer.latency = Latency::NotTested;
        }
        let round = self.round;
        self.peers
            .iter()
            .map(|peer| ProbeRequest {
                peer: peer.clone(),
                round,
            })
            .collect()
    }

    /// Merge one result into the list.
    pub fn apply(&mut self, result: &ProbeResult) -> Applied {
        if result.round != self.round {
            tracing::debug!(
                peer = %result.peer.host,
                result_round = result.round,
                round = self.round,
                "dropping result from earlier round"
            );
            return Applied::Stale;
        }
        let Some(&i) = self.index.get(&result.peer.host) else {
            tracing::debug!(peer = %result.peer.host, "dropping result for unknown peer");
            return Applied::Stale;
        };

        self.peers[i].latency = result.peer.latency;
        self.tested += 1;
        Applied::Updated
    }

    /// Requests discarded by a cancel never report; stop waiting for them.
    pub fn abandon(&mut self, discarded: usize) {
        self.total = self.total.saturating_sub(discarded);
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn tested_count(&self) -> usize {
        self.tested
    }

    pub fn total_count(&self) -> usize {
        self.total
    }

    /// Every request of the current round has reported.
    pub fn is_complete(&self) -> bool {
        self.tested >= self.total
    }

    pub fn peers(&self) -> &[PeerRecord] {
        &self.peers
    }

    pub fn get(&self, host: &str) -> Option<&PeerRecord> {
        self.index.get(host).map(|&i| &self.peers[i])
    }

    /// Peers whose host is in `hosts`, in list order. An empty selection
    /// means the whole list.
    pub fn select(&self, hosts: &[String]) -> Vec<PeerRecord> {
        if hosts.is_empty() {
            return self.peers.clone();
        }
        self.peers
            .iter()
            .filter(|p| hosts.iter().any(|h| *h == p.host))
            .cloned()
            .collect()
    }
}
