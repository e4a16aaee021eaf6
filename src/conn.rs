//! Transparent connection wrapper with lazy header resolution.
//!
//! [`Conn`] behaves exactly like the transport it wraps, except that the
//! reported peer/local addresses reflect the original client once a PROXY
//! header has been decoded. Resolution runs at most once per connection,
//! triggered by the first read or address query, and its outcome (header,
//! no header, or error) is memoized for the connection's lifetime.

use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::{debug, warn};

use crate::error::{sticky_io, ProxyError};
use crate::header::Header;
use crate::parser::{HeaderParser, Parsed, StubParser};

/// Per-connection resolution state. Transitions out of `Pending` exactly
/// once; the terminal states never change.
enum Resolution {
    Pending,
    Done(Option<Header>),
    Failed(Arc<ProxyError>),
}

/// Connection wrapper performing exactly-once lazy PROXY header resolution.
///
/// Header-detection reads land in an internal read-ahead buffer; bytes that
/// turn out not to belong to a header are handed back to the first
/// application read, so the transport is never read twice for the same
/// bytes. Writes, flush and shutdown pass through untouched and never
/// trigger resolution.
pub struct Conn<C> {
    io: C,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    parser: Arc<dyn HeaderParser>,
    buf: BytesMut,
    read_ahead: usize,
    resolution: Resolution,
}

impl<C> std::fmt::Debug for Conn<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conn")
            .field("local_addr", &self.local_addr)
            .field("peer_addr", &self.peer_addr)
            .field("read_ahead", &self.read_ahead)
            .finish_non_exhaustive()
    }
}

impl<C> Conn<C> {
    /// Wrap a transport whose byte stream may start with a PROXY header.
    ///
    /// `local_addr` and `peer_addr` are the transport-level addresses,
    /// reported whenever no header addresses are available. `read_ahead`
    /// bounds the header-detection buffer; a header that does not terminate
    /// within it fails resolution with [`ProxyError::HeaderTooLong`].
    pub fn new(
        io: C,
        local_addr: SocketAddr,
        peer_addr: SocketAddr,
        parser: Arc<dyn HeaderParser>,
        read_ahead: usize,
    ) -> Self {
        Conn {
            io,
            local_addr,
            peer_addr,
            parser,
            buf: BytesMut::with_capacity(read_ahead),
            read_ahead,
            resolution: Resolution::Pending,
        }
    }

    /// Wrap a transport without attempting any header parse: a pure
    /// passthrough. Used for peers the trust gate rejects, so an untrusted
    /// peer can never claim an arbitrary address.
    pub fn raw(io: C, local_addr: SocketAddr, peer_addr: SocketAddr) -> Self {
        Conn {
            io,
            local_addr,
            peer_addr,
            parser: Arc::new(StubParser::new()),
            buf: BytesMut::new(),
            read_ahead: 0,
            resolution: Resolution::Done(None),
        }
    }

    /// Transport-level peer address, regardless of resolution state.
    pub fn raw_peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Transport-level local address, regardless of resolution state.
    pub fn raw_local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared reference to the wrapped transport.
    pub fn get_ref(&self) -> &C {
        &self.io
    }
}

impl<C: AsyncRead + Unpin> Conn<C> {
    /// Resolve the header if still pending and return the decoded result.
    ///
    /// Unlike the address accessors this surfaces resolution errors, which
    /// lets an embedder distinguish "no header" from "malformed header".
    pub async fn proxy_header(&mut self) -> io::Result<Option<Header>> {
        poll_fn(|cx| self.poll_resolve(cx))
            .await
            .map_err(|e| sticky_io(&e))
    }

    /// Effective peer address: the header's source when one was decoded,
    /// the transport's peer address otherwise. Never fails; a resolution
    /// error degrades to the transport address (the error was already
    /// logged and stays visible on the read path).
    pub async fn peer_addr(&mut self) -> SocketAddr {
        match poll_fn(|cx| self.poll_resolve(cx)).await {
            Ok(Some(header)) => header.src,
            Ok(None) | Err(_) => self.peer_addr,
        }
    }

    /// Effective local address: the header's destination when one was
    /// decoded, the transport's local address otherwise. Never fails.
    pub async fn local_addr(&mut self) -> SocketAddr {
        match poll_fn(|cx| self.poll_resolve(cx)).await {
            Ok(Some(header)) => header.dst,
            Ok(None) | Err(_) => self.local_addr,
        }
    }

    /// Drive resolution to a terminal state. The `&mut` receiver is the
    /// single-flight guarantee: no two callers can race the decode, and
    /// every later caller observes the memoized terminal state.
    fn poll_resolve(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Header>, Arc<ProxyError>>> {
        loop {
            match &self.resolution {
                Resolution::Done(header) => return Poll::Ready(Ok(*header)),
                Resolution::Failed(e) => return Poll::Ready(Err(Arc::clone(e))),
                Resolution::Pending => {}
            }

            match self.parser.parse(&self.buf) {
                Ok(Parsed::Complete { header, consumed }) => {
                    self.buf.advance(consumed);
                    debug!(
                        consumed,
                        header = header.is_some(),
                        "header resolution complete"
                    );
                    self.resolution = Resolution::Done(header);
                }
                Ok(Parsed::Mismatch) => {
                    // Only reachable with a bare decoder installed instead
                    // of a fallback chain: nothing claimed the stream.
                    self.fail(ProxyError::InvalidHeader);
                }
                Ok(Parsed::Incomplete) => {
                    if self.buf.len() >= self.read_ahead {
                        self.fail(ProxyError::HeaderTooLong);
                        continue;
                    }
                    let mut chunk = [0u8; 512];
                    let want = chunk.len().min(self.read_ahead - self.buf.len());
                    let mut read_buf = ReadBuf::new(&mut chunk[..want]);
                    match Pin::new(&mut self.io).poll_read(cx, &mut read_buf) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Err(e)) => self.fail(ProxyError::Io(e)),
                        Poll::Ready(Ok(())) if read_buf.filled().is_empty() => {
                            // Stream ended inside a header.
                            self.fail(ProxyError::Io(io::ErrorKind::UnexpectedEof.into()));
                        }
                        Poll::Ready(Ok(())) => self.buf.extend_from_slice(read_buf.filled()),
                    }
                }
                Err(e) => self.fail(e),
            }
        }
    }

    fn fail(&mut self, e: ProxyError) {
        warn!(peer = %self.peer_addr, error = %e, "header resolution failed");
        self.resolution = Resolution::Failed(Arc::new(e));
    }
}

impl<C: AsyncRead + Unpin> AsyncRead for Conn<C> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        // Sticky: a failed resolution poisons every subsequent read with
        // the same error, without touching the stream again.
        if let Err(e) = ready!(this.poll_resolve(cx)) {
            return Poll::Ready(Err(sticky_io(&e)));
        }

        // Serve bytes buffered during header detection first.
        if !this.buf.is_empty() {
            let n = this.buf.len().min(out.remaining());
            out.put_slice(&this.buf[..n]);
            this.buf.advance(n);
            return Poll::Ready(Ok(()));
        }

        Pin::new(&mut this.io).poll_read(cx, out)
    }
}

impl<C: AsyncWrite + Unpin> AsyncWrite for Conn<C> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().io).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().io).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.io.is_write_vectored()
    }
}
