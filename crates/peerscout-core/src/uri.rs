//! Peer URI parsing.
//!
//! Accepted forms:
//!   scheme://host:port
//!   scheme://[v6addr]:port
//!   host:port
//!   [v6addr]:port
//!
//! Anything after the authority (`/path`, `?query`) is ignored. A port is
//! always required; an unbracketed IPv6 literal is rejected because the
//! port boundary is ambiguous.

/// Schemes listed by public peer directories.
pub const PEER_SCHEMES: [&str; 3] = ["tls", "tcp", "quic"];

/// A parsed peer URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerUri<'a> {
    pub scheme: Option<&'a str>,
    pub host: &'a str,
    pub port: u16,
}

impl<'a> PeerUri<'a> {
    pub fn parse(uri: &'a str) -> Option<Self> {
        let uri = uri.trim();
        let (scheme, rest) = match uri.split_once("://") {
            Some((scheme, rest)) => {
                let well_formed = !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
                if !well_formed {
                    return None;
                }
                (Some(scheme), rest)
            }
            None => (None, uri),
        };

        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, tail) = bracketed.split_once(']')?;
            (host, tail.strip_prefix(':')?)
        } else {
            let (host, port) = authority.rsplit_once(':')?;
            if host.contains(':') {
                return None;
            }
            (host, port)
        };

        if host.is_empty() || !host.chars().all(is_host_char) {
            return None;
        }
        let port = port.parse().ok()?;

        Some(Self { scheme, host, port })
    }

    /// True for `tls://`, `tcp://` and `quic://` URIs.
    pub fn has_peer_scheme(&self) -> bool {
        self.scheme
            .map(|s| PEER_SCHEMES.contains(&s))
            .unwrap_or(false)
    }
}

fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_' | '%')
}

/// Bare host or address of a peer URI, or an empty string when none can be
/// derived.
pub fn hostname(uri: &str) -> String {
    PeerUri::parse(uri)
        .map(|u| u.host.to_string())
        .unwrap_or_default()
}
