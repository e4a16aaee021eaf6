//! Embedder-facing configuration for PROXY protocol support.

use std::net::IpAddr;
use std::sync::Arc;

use serde::Deserialize;

use crate::listener::SourceCheck;
use crate::wire;

/// PROXY protocol configuration for a listener
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Enable PROXY protocol parsing on this listener
    pub enabled: bool,

    /// Read-ahead buffer size in bytes. Must comfortably hold the largest
    /// expected header; bytes probed but not consumed by a header are
    /// re-delivered to the first application read.
    /// Default: 1400 bytes
    pub read_ahead: usize,

    /// Peer addresses whose PROXY headers are honored. An empty list means
    /// every peer is trusted; otherwise connections from other addresses
    /// are passed through with header parsing skipped.
    pub trusted: Vec<IpAddr>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            read_ahead: wire::DEFAULT_READ_AHEAD,
            trusted: Vec::new(),
        }
    }
}

impl ProxyConfig {
    /// Trust gate matching peers against the configured address list, or
    /// `None` when every peer is trusted.
    pub fn source_check(&self) -> Option<SourceCheck> {
        if self.trusted.is_empty() {
            return None;
        }
        let trusted = self.trusted.clone();
        Some(Arc::new(move |peer: std::net::SocketAddr| {
            Ok(trusted.contains(&peer.ip()))
        }))
    }
}
