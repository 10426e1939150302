//! Configuration system for peerscout.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $PEERSCOUT_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/peerscout/config.toml
//!   3. ~/.config/peerscout/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerscoutConfig {
    pub discovery: DiscoveryConfig,
    pub probe: ProbeConfig,
    pub apply: ApplyConfig,
    pub service: ServiceConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Page listing public peers in table cells.
    pub url: String,
    /// Proxy for the fetch, e.g. `socks5://127.0.0.1:9050`. Empty = direct.
    pub proxy: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Echo utility. The bare host is appended as the last argument.
    pub program: String,
    /// Arguments placed before the host. Empty = `-c <count>`.
    pub args: Vec<String>,
    /// Echo requests per probe.
    pub count: u32,
    /// Maximum simultaneous probes. 0 = 1.
    pub concurrency: usize,
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    /// Time between SIGTERM and SIGKILL.
    pub grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    /// Privilege-escalation wrapper.
    pub elevate: String,
    /// Distribution-specific script that rewrites the daemon's peer list.
    pub script_path: PathBuf,
    pub timeout_secs: u64,
    /// Output text treated as success even when the script exits with 1.
    pub success_marker: String,
    /// Number of peers the script keeps from the head of the list.
    pub max_peers: usize,
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// systemd unit name of the mesh daemon.
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Candidate admin socket paths, tried in order.
    pub socket_paths: Vec<PathBuf>,
    pub timeout_ms: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            url: "https://publicpeers.neilalexander.dev/".to_string(),
            proxy: String::new(),
            timeout_secs: 15,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: "ping".to_string(),
            args: Vec::new(),
            count: 3,
            concurrency: 5,
            poll_interval_ms: 100,
            timeout_ms: 5_000,
            grace_ms: 500,
        }
    }
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            elevate: "pkexec".to_string(),
            script_path: PathBuf::from("/usr/share/peerscout/update-peers.sh"),
            timeout_secs: 30,
            success_marker: "updated successfully".to_string(),
            max_peers: 15,
            verbose: false,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "yggdrasil".to_string(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            socket_paths: vec![
                PathBuf::from("/var/run/yggdrasil/yggdrasil.sock"),
                PathBuf::from("/var/run/yggdrasil.sock"),
                PathBuf::from("/run/yggdrasil.sock"),
            ],
            timeout_ms: 3_000,
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl ProbeConfig {
    /// Full argument list for one probe against `host`.
    pub fn command_args(&self, host: &str) -> Vec<String> {
        let mut args = if self.args.is_empty() {
            vec!["-c".to_string(), self.count.to_string()]
        } else {
            self.args.clone()
        };
        args.push(host.to_string());
        args
    }

    pub fn workers(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("peerscout")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl PeerscoutConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            Self::parse(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            PeerscoutConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("PEERSCOUT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config to `path` if nothing is there yet. Returns the path.
    pub fn write_default_if_missing(path: &Path) -> Result<PathBuf, ConfigError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
            }
            let text = toml::to_string_pretty(&PeerscoutConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(path, text)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        Ok(path.to_path_buf())
    }

    /// Apply PEERSCOUT_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("PEERSCOUT_DISCOVERY__URL") {
            self.discovery.url = v;
        }
        if let Some(v) = lookup("PEERSCOUT_DISCOVERY__PROXY") {
            self.discovery.proxy = v;
        }
        if let Some(v) = lookup("PEERSCOUT_PROBE__PROGRAM") {
            self.probe.program = v;
        }
        if let Some(v) = lookup("PEERSCOUT_PROBE__CONCURRENCY") {
            if let Ok(n) = v.parse() {
                self.probe.concurrency = n;
            }
        }
        if let Some(v) = lookup("PEERSCOUT_PROBE__TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.probe.timeout_ms = n;
            }
        }
        if let Some(v) = lookup("PEERSCOUT_APPLY__SCRIPT_PATH") {
            self.apply.script_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("PEERSCOUT_APPLY__VERBOSE") {
            self.apply.verbose = v == "true" || v == "1";
        }
        if let Some(v) = lookup("PEERSCOUT_SERVICE__NAME") {
            self.service.name = v;
        }
    }
}
