//! peerscout-services: concurrent peer probing and the side effects around
//! it: discovery, the probe pool, result aggregation, the privileged apply
//! step, and daemon control.
//!
//! ```text
//!  PeerDirectory ──► PeerResultAggregator ──begin_round──► ProbePool
//!                          ▲                                 │ workers
//!                          └──────── ProbeResult ◄── ProbeTask (ping)
//!                          │
//!                          └──select──► PeerApplier ──► update script
//! ```

pub mod admin;
pub mod aggregator;
pub mod apply;
pub mod cancel;
pub mod discovery;
pub mod pool;
pub mod probe;
pub mod process;
pub mod service;
pub mod session;

pub use admin::{AdminError, AdminSocket};
pub use aggregator::{Applied, PeerResultAggregator};
pub use apply::{ApplyError, ApplyReport, PeerApplier};
pub use cancel::CancellationToken;
pub use discovery::{DiscoveryError, PeerDirectory};
pub use pool::{ProbePool, ResultReceiver};
pub use probe::ProbeTask;
pub use process::{ProcessError, ProcessOutput, ProcessRunner, SystemRunner};
pub use service::{ServiceAction, ServiceError, ServiceManager};
pub use session::{RoundSummary, TestSession};
