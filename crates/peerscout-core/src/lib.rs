//! peerscout-core: peer records, URI parsing, ordering, CSV export and
//! configuration. All other peerscout crates depend on this one.

pub mod config;
pub mod csv;
pub mod order;
pub mod peer;
pub mod uri;

pub use config::PeerscoutConfig;
pub use order::{quality_order, sorted_by_quality};
pub use peer::{Latency, PeerRecord, ProbeOutcome, ProbeRequest, ProbeResult};
pub use uri::{hostname, PeerUri};
