//! Mesh daemon admin socket client.
//!
//! Requests are single-line JSON objects terminated by `\n`; the daemon
//! answers with one JSON line. The socket is the first candidate path that
//! accepts a connection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::timeout;

use peerscout_core::config::AdminConfig;

/// Per-candidate connect probe.
const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("no admin socket found among {0} candidate path(s)")]
    NoSocket(usize),
    #[error("admin socket {0}: connect timed out")]
    ConnectTimeout(PathBuf),
    #[error("admin socket {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("admin socket {0}: no response")]
    NoResponse(PathBuf),
    #[error("admin socket returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("admin request failed: {0}")]
    Daemon(String),
    #[error("admin response has no '{0}' field")]
    MissingField(&'static str),
}

pub struct AdminSocket {
    candidates: Vec<PathBuf>,
    timeout: Duration,
}

impl AdminSocket {
    pub fn new(config: &AdminConfig) -> Self {
        Self {
            candidates: config.socket_paths.clone(),
            timeout: Duration::from_millis(config.timeout_ms.max(1)),
        }
    }

    /// First candidate that exists and accepts a connection.
    pub async fn locate(&self) -> Result<PathBuf, AdminError> {
        for path in &self.candidates {
            if !path.exists() {
                tracing::debug!(path = %path.display(), "admin socket path does not exist");
                continue;
            }
            match timeout(PROBE_CONNECT_TIMEOUT, UnixStream::connect(path)).await {
                Ok(Ok(_)) => {
                    tracing::debug!(path = %path.display(), "using admin socket");
                    return Ok(path.clone());
                }
                Ok(Err(e)) => {
                    tracing::debug!(path = %path.display(), error = %e, "admin socket not connectable")
                }
                Err(_) => {
                    tracing::debug!(path = %path.display(), "admin socket connect timed out")
                }
            }
        }
        Err(AdminError::NoSocket(self.candidates.len()))
    }

    /// Send one request object and return the decoded reply.
    pub async fn request(&self, request: &Value) -> Result<Value, AdminError> {
        let path = self.locate().await?;
        self.request_at(&path, request).await
    }

    async fn request_at(&self, path: &Path, request: &Value) -> Result<Value, AdminError> {
        let io = |source| AdminError::Io {
            path: path.to_path_buf(),
            source,
        };

        let stream = timeout(self.timeout, UnixStream::connect(path))
            .await
            .map_err(|_| AdminError::ConnectTimeout(path.to_path_buf()))?
            .map_err(io)?;
        let (read_half, mut write_half) = stream.into_split();

        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        timeout(self.timeout, write_half.write_all(&line))
            .await
            .map_err(|_| AdminError::NoResponse(path.to_path_buf()))?
            .map_err(io)?;

        let mut reply = String::new();
        let read = timeout(self.timeout, BufReader::new(read_half).read_line(&mut reply))
            .await
            .map_err(|_| AdminError::NoResponse(path.to_path_buf()))?
            .map_err(io)?;
        if read == 0 || reply.trim().is_empty() {
            return Err(AdminError::NoResponse(path.to_path_buf()));
        }

        let reply: Value = serde_json::from_str(reply.trim())?;
        if reply.get("status").and_then(Value::as_str) == Some("error") {
            let message = reply
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(AdminError::Daemon(message.to_string()));
        }
        Ok(reply)
    }

    /// The node's own mesh address (`getself` → `response.address`).
    pub async fn self_address(&self) -> Result<String, AdminError> {
        let reply = self.request(&json!({ "request": "getself" })).await?;
        reply
            .get("response")
            .and_then(|r| r.get("address"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(AdminError::MissingField("response.address"))
    }
}
