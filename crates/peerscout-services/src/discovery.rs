//! Peer discovery from a public peer directory page.
//!
//! The directory is an HTML table; every `<td>` whose text is a
//! `tls://`, `tcp://` or `quic://` URI with a `host:port` authority becomes
//! an untested `PeerRecord`. Page order is kept, duplicates dropped.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use peerscout_core::config::DiscoveryConfig;
use peerscout_core::{PeerRecord, PeerUri};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("invalid proxy '{0}': {1}")]
    Proxy(String, #[source] reqwest::Error),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to fetch peers from {0}: {1}")]
    Fetch(String, #[source] reqwest::Error),
    #[error("peer directory {0} answered {1}")]
    Status(String, reqwest::StatusCode),
}

fn cell_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"<td[^>]*>([^<]+)</td>").expect("cell pattern is valid"))
}

/// Extract peer URIs from directory HTML.
pub fn parse_peer_table(html: &str) -> Vec<PeerRecord> {
    let mut seen = HashSet::new();
    cell_regex()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|text| {
            PeerUri::parse(text)
                .map(|uri| uri.has_peer_scheme())
                .unwrap_or(false)
        })
        .filter(|text| seen.insert(text.to_string()))
        .map(PeerRecord::new)
        .collect()
}

/// Fetches the directory page over HTTP(S).
pub struct PeerDirectory {
    client: reqwest::Client,
    url: String,
}

impl PeerDirectory {
    pub fn new(config: &DiscoveryConfig) -> Result<Self, DiscoveryError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs.max(1)));
        if !config.proxy.is_empty() {
            let proxy = reqwest::Proxy::all(&config.proxy)
                .map_err(|e| DiscoveryError::Proxy(config.proxy.clone(), e))?;
            builder = builder.proxy(proxy);
        }
        Ok(Self {
            client: builder.build().map_err(DiscoveryError::Client)?,
            url: config.url.clone(),
        })
    }

    pub async fn fetch(&self) -> Result<Vec<PeerRecord>, DiscoveryError> {
        tracing::info!(url = %self.url, "fetching peer directory");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DiscoveryError::Fetch(self.url.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status(self.url.clone(), status));
        }

        let html = response
            .text()
            .await
            .map_err(|e| DiscoveryError::Fetch(self.url.clone(), e))?;

        let peers = parse_peer_table(&html);
        tracing::info!(peers = peers.len(), "peer directory parsed");
        Ok(peers)
    }
}
