//! Listening wrapper: accepts raw connections, applies the trust gate and
//! hands out [`Conn`]s with a pending header resolution.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::config::ProxyConfig;
use crate::conn::Conn;
use crate::parser::{FallbackParser, HeaderParser, StubParser};
use crate::wire;

/// Trust predicate over the transport-level peer address, evaluated once
/// per accepted connection before any header parsing. `false` skips header
/// parsing entirely; an error aborts the accept.
pub type SourceCheck = Arc<dyn Fn(SocketAddr) -> io::Result<bool> + Send + Sync>;

/// PROXY-protocol-aware wrapper around a [`TcpListener`].
///
/// By default every peer is trusted and the fallback decoder chain
/// (text, binary, stub) probes each accepted stream lazily.
pub struct Listener {
    inner: TcpListener,
    parser: Arc<dyn HeaderParser>,
    source_check: Option<SourceCheck>,
    read_ahead: usize,
}

impl Listener {
    pub fn new(inner: TcpListener) -> Self {
        Listener {
            inner,
            parser: Arc::new(FallbackParser::default()),
            source_check: None,
            read_ahead: wire::DEFAULT_READ_AHEAD,
        }
    }

    /// Build a listener from embedder configuration: the enabled flag,
    /// read-ahead size and the trusted-source gate derived from the config's
    /// address list.
    ///
    /// With `enabled: false` every connection is passed through untouched;
    /// no peer can claim addresses via a header.
    pub fn from_config(inner: TcpListener, config: &ProxyConfig) -> Self {
        let mut listener = Listener::new(inner).with_read_ahead(config.read_ahead);
        if !config.enabled {
            return listener.with_parser(Arc::new(StubParser::new()));
        }
        if let Some(check) = config.source_check() {
            listener = listener.with_source_check(check);
        }
        listener
    }

    /// Replace the decoder chain. Lets an embedder reorder decoders or drop
    /// the stub safety net.
    pub fn with_parser(mut self, parser: Arc<dyn HeaderParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Install a trust gate.
    pub fn with_source_check(mut self, source_check: SourceCheck) -> Self {
        self.source_check = Some(source_check);
        self
    }

    /// Override the read-ahead buffer size for wrapped connections.
    pub fn with_read_ahead(mut self, read_ahead: usize) -> Self {
        self.read_ahead = read_ahead;
        self
    }

    /// Accept one connection.
    ///
    /// Untrusted peers get a passthrough wrapper that never parses, so they
    /// cannot spoof addresses. A failing trust predicate drops the
    /// connection and propagates the error.
    pub async fn accept(&self) -> io::Result<Conn<TcpStream>> {
        let (stream, peer_addr) = self.inner.accept().await?;
        let local_addr = stream.local_addr()?;

        if let Some(source_check) = &self.source_check {
            match source_check(peer_addr) {
                Err(e) => {
                    warn!(peer = %peer_addr, error = %e, "source check failed");
                    return Err(e);
                }
                Ok(false) => {
                    debug!(peer = %peer_addr, "untrusted source, header parse skipped");
                    return Ok(Conn::raw(stream, local_addr, peer_addr));
                }
                Ok(true) => {}
            }
        }

        debug!(peer = %peer_addr, "accepted, header resolution pending");
        Ok(Conn::new(
            stream,
            local_addr,
            peer_addr,
            Arc::clone(&self.parser),
            self.read_ahead,
        ))
    }

    /// Address this listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Shared reference to the wrapped listener.
    pub fn get_ref(&self) -> &TcpListener {
        &self.inner
    }

    /// Unwrap back into the raw listener.
    pub fn into_inner(self) -> TcpListener {
        self.inner
    }
}
