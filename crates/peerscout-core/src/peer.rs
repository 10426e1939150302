//! Peer records and the values that cross the probe pool boundary.
//!
//! A `PeerRecord` is identified by its `host` URI. Latency is one of three
//! states: never probed, probed and failed, or measured. The signed
//! sentinel view (`-1` not tested, `-2` failed) is kept for export and for
//! callers that still speak integers.

use serde::{Deserialize, Serialize};

/// Sentinel for a peer that has never completed a probe.
pub const NOT_TESTED_MS: i64 = -1;

/// Sentinel for a peer whose probe completed without a usable measurement.
pub const FAILED_MS: i64 = -2;

/// Latency state of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "ms")]
pub enum Latency {
    #[default]
    NotTested,
    Failed,
    Measured(u32),
}

impl Latency {
    /// Signed sentinel view of this latency.
    pub fn as_ms(self) -> i64 {
        match self {
            Latency::NotTested => NOT_TESTED_MS,
            Latency::Failed => FAILED_MS,
            Latency::Measured(ms) => i64::from(ms),
        }
    }

    /// Inverse of [`Latency::as_ms`]. `-1` is not tested, any other negative
    /// value is a failure.
    pub fn from_ms(ms: i64) -> Self {
        match ms {
            NOT_TESTED_MS => Latency::NotTested,
            m if m < 0 => Latency::Failed,
            m => Latency::Measured(u32::try_from(m).unwrap_or(u32::MAX)),
        }
    }

    pub fn is_tested(self) -> bool {
        !matches!(self, Latency::NotTested)
    }
}

impl std::fmt::Display for Latency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Latency::NotTested => f.write_str("not tested"),
            Latency::Failed => f.write_str("failed"),
            Latency::Measured(ms) => write!(f, "{ms} ms"),
        }
    }
}

/// A candidate peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    /// Connection URI, e.g. `tls://[2001:db8::1]:443`. Identity key.
    pub host: String,
    #[serde(default)]
    pub latency: Latency,
}

impl PeerRecord {
    /// Untested record for a discovered URI.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            latency: Latency::NotTested,
        }
    }

    pub fn with_latency(host: impl Into<String>, latency: Latency) -> Self {
        Self {
            host: host.into(),
            latency,
        }
    }

    /// True only for a successful, parsed measurement.
    pub fn is_valid(&self) -> bool {
        matches!(self.latency, Latency::Measured(_))
    }

    pub fn latency_ms(&self) -> i64 {
        self.latency.as_ms()
    }

    pub fn is_tested(&self) -> bool {
        self.latency.is_tested()
    }
}

/// A snapshot of a peer submitted for probing, tagged with the round that
/// requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub peer: PeerRecord,
    pub round: u64,
}

/// How a probe ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Probe exited cleanly and the average round-trip time was parsed.
    Reachable,
    /// Probe exited with a non-zero status.
    Unreachable,
    /// Probe ran past the ceiling and was terminated.
    TimedOut,
    /// The session was cancelled before or during the probe.
    Cancelled,
    /// The probe program could not be started.
    SpawnFailed,
    /// No host could be derived, or the output had no statistics line.
    Unparseable,
}

/// The single result produced for every started probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub peer: PeerRecord,
    pub round: u64,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    /// Successful measurement.
    pub fn measured(request: ProbeRequest, ms: u32) -> Self {
        Self::finish(request, ProbeOutcome::Reachable, Latency::Measured(ms))
    }

    /// Any terminal state other than success. Cancelled probes report
    /// `NotTested`, everything else reports `Failed`.
    pub fn unsuccessful(request: ProbeRequest, outcome: ProbeOutcome) -> Self {
        let latency = match outcome {
            ProbeOutcome::Cancelled => Latency::NotTested,
            _ => Latency::Failed,
        };
        Self::finish(request, outcome, latency)
    }

    fn finish(request: ProbeRequest, outcome: ProbeOutcome, latency: Latency) -> Self {
        let ProbeRequest { mut peer, round } = request;
        peer.latency = latency;
        Self {
            peer,
            round,
            outcome,
        }
    }
}
