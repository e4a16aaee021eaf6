//! Decoded header addresses.

use std::net::SocketAddr;

/// Original client/destination addresses recovered from a PROXY header.
///
/// A decode outcome of `None` (no `Header` at all) is meaningful: the peer
/// declared LOCAL / UNKNOWN / UNSPEC, or no decoder claimed the stream, and
/// the transport-level addresses remain authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Original client address (source of the proxied connection).
    pub src: SocketAddr,
    /// Original destination address (what the client connected to).
    pub dst: SocketAddr,
}
