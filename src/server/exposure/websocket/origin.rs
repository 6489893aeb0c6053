//! Handshake-time origin validation
//!
//! With an empty allow-list the gate is open (local/dev mode). Otherwise the
//! `Origin` header is parsed, normalized to `scheme://host[:port]`, and must be
//! an exact, case-sensitive member of the allow-list. Configured entries are
//! compared verbatim. A missing header never matches.

use axum::http::Uri;
use std::collections::HashSet;
use thiserror::Error;

/// Why an upgrade request was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginRejection {
    /// No `Origin` header, or an empty one
    #[error("Missing origin")]
    Missing,

    /// The header is not a `scheme://host[:port]` origin
    #[error("Unparseable origin {0:?}")]
    Unparseable(String),

    /// Well-formed, but not on the allow-list
    #[error("Origin {0:?} not allowed")]
    NotAllowed(String),
}

/// Allow-list check consulted before a connection is registered
#[derive(Debug, Clone, Default)]
pub struct OriginGate {
    allowed: HashSet<String>,
}

impl OriginGate {
    /// Build a gate from configured origins
    ///
    /// Entries are trimmed and otherwise kept as written.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = origins
            .into_iter()
            .map(|o| o.as_ref().trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        Self { allowed }
    }

    /// A gate that accepts everything
    pub fn open() -> Self {
        Self::default()
    }

    /// `true` when no allow-list is configured
    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Decide whether to accept an upgrade with the given `Origin` header
    pub fn check(&self, origin: Option<&str>) -> Result<(), OriginRejection> {
        if self.is_open() {
            return Ok(());
        }

        let raw = origin.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(OriginRejection::Missing);
        }

        let normalized =
            normalize_origin(raw).ok_or_else(|| OriginRejection::Unparseable(raw.to_string()))?;

        if self.allowed.contains(&normalized) {
            Ok(())
        } else {
            Err(OriginRejection::NotAllowed(normalized))
        }
    }
}

/// Normalize an origin to `scheme://host[:port]`
///
/// Scheme and host are lowercased and the scheme's default port is dropped.
/// Returns `None` for anything that is not a bare origin (paths, queries,
/// credentials, missing scheme or host).
pub fn normalize_origin(raw: &str) -> Option<String> {
    let uri: Uri = raw.parse().ok()?;
    let scheme = uri.scheme_str()?.to_ascii_lowercase();
    let authority = uri.authority()?;

    if authority.as_str().contains('@') {
        return None;
    }
    if uri.query().is_some() || !matches!(uri.path(), "" | "/") {
        return None;
    }

    let host = authority.host().to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }

    let default_port = match scheme.as_str() {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        _ => None,
    };

    match authority.port_u16() {
        Some(port) if Some(port) != default_port => Some(format!("{}://{}:{}", scheme, host, port)),
        _ => Some(format!("{}://{}", scheme, host)),
    }
}
