//! Quality ordering: measured peers first by ascending latency, everything
//! else after them in its original relative order.

use std::cmp::Ordering;

use crate::peer::{Latency, PeerRecord};

/// Total order used when picking peers for the daemon config.
pub fn quality_order(a: &PeerRecord, b: &PeerRecord) -> Ordering {
    match (a.latency, b.latency) {
        (Latency::Measured(x), Latency::Measured(y)) => x.cmp(&y),
        (Latency::Measured(_), _) => Ordering::Less,
        (_, Latency::Measured(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Stable sort of a copy; the input slice keeps its order.
pub fn sorted_by_quality(peers: &[PeerRecord]) -> Vec<PeerRecord> {
    let mut sorted = peers.to_vec();
    sorted.sort_by(quality_order);
    sorted
}
