//! Error taxonomy for header resolution.
//!
//! A signature that does not match a decoder's format is *not* an error (it
//! drives fallback continuation, see [`crate::parser::Parsed::Mismatch`]).
//! Everything here is fatal to a connection's header resolution.

use std::io;
use std::sync::Arc;

/// Errors that can occur while resolving a PROXY protocol header
#[derive(Debug)]
pub enum ProxyError {
    /// v2 version nibble is not 2
    UnknownVersion(u8),
    /// v2 command nibble is neither LOCAL nor PROXY
    UnknownCommand(u8),
    /// Unrecognized protocol family (v1 keyword or v2 family bits)
    UnknownProtocol(String),
    /// v1 header line does not carry exactly four address fields
    InvalidAddressList,
    /// v1 address field is not a textual IP
    InvalidIp(String),
    /// v1 port field is not a decimal 16-bit integer
    InvalidPort(String),
    /// v2 address block shorter than its family requires
    UnexpectedAddressLen { expected: usize, actual: usize },
    /// Header did not terminate within the read-ahead buffer
    HeaderTooLong,
    /// No decoder in the chain recognized the stream
    InvalidHeader,
    /// IO error reading from the transport (including truncated headers)
    Io(io::Error),
}

impl std::fmt::Display for ProxyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyError::UnknownVersion(byte) => write!(f, "unknown version: {:#04x}", byte),
            ProxyError::UnknownCommand(byte) => write!(f, "unknown command: {:#04x}", byte),
            ProxyError::UnknownProtocol(proto) => write!(f, "unknown protocol: {}", proto),
            ProxyError::InvalidAddressList => write!(f, "invalid address list"),
            ProxyError::InvalidIp(ip) => write!(f, "invalid IP: {}", ip),
            ProxyError::InvalidPort(port) => write!(f, "invalid port: {}", port),
            ProxyError::UnexpectedAddressLen { expected, actual } => write!(
                f,
                "unexpected address length: expected at least {} bytes, got {}",
                expected, actual
            ),
            ProxyError::HeaderTooLong => write!(f, "header exceeds read-ahead buffer"),
            ProxyError::InvalidHeader => write!(f, "invalid header"),
            ProxyError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProxyError {
    fn from(e: io::Error) -> Self {
        ProxyError::Io(e)
    }
}

impl ProxyError {
    /// The `io::ErrorKind` this error surfaces as on the read path.
    pub(crate) fn io_kind(&self) -> io::ErrorKind {
        match self {
            ProxyError::Io(e) => e.kind(),
            _ => io::ErrorKind::InvalidData,
        }
    }
}

/// Shared handle to a cached resolution error, handed out anew on every
/// read after a failed resolution.
#[derive(Debug, Clone)]
struct Sticky(Arc<ProxyError>);

impl std::fmt::Display for Sticky {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for Sticky {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0.as_ref())
    }
}

/// Build a fresh `io::Error` sharing the given error. Used for the sticky
/// failure: every read after a failed resolution reports the same
/// underlying error.
pub(crate) fn sticky_io(err: &Arc<ProxyError>) -> io::Error {
    io::Error::new(err.io_kind(), Sticky(Arc::clone(err)))
}
