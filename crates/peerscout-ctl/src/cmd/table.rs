//! Terminal rendering for peer lists.

use peerscout_core::PeerRecord;

pub fn banner(title: &str) {
    println!("═══════════════════════════════════════");
    println!("  {title}");
    println!("═══════════════════════════════════════");
}

/// One row per peer in list order; latency column first so hosts line up.
pub fn print_peers(title: &str, peers: &[PeerRecord]) {
    banner(title);
    if peers.is_empty() {
        println!("  No peers.");
        return;
    }
    for peer in peers {
        let mark = match (peer.is_tested(), peer.is_valid()) {
            (false, _) => ' ',
            (true, true) => '✓',
            (true, false) => '✗',
        };
        println!("  {mark} {:>10}  {}", peer.latency.to_string(), peer.host);
    }
}
