//! PROXY header decoders.
//!
//! Decoders are pure incremental functions over the connection's read-ahead
//! buffer: they inspect buffered bytes without performing I/O, so probing a
//! format never consumes anything from the stream. The connection wrapper
//! refills the buffer whenever a decoder reports [`Parsed::Incomplete`].

mod binary;
mod fallback;
mod text;

pub use binary::BinaryParser;
pub use fallback::{FallbackParser, StubParser};
pub use text::TextParser;

use crate::error::ProxyError;
use crate::header::Header;

/// Outcome of probing buffered bytes with one decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// The decoder recognized and fully consumed a header. `header` is
    /// `None` for LOCAL / UNKNOWN / UNSPEC records: the record is valid but
    /// carries no usable original addresses. `consumed` bytes belong to the
    /// header and must be stripped before application data.
    Complete {
        header: Option<Header>,
        consumed: usize,
    },
    /// The buffered bytes do not start with this decoder's signature.
    /// Nothing was consumed; the next decoder may probe the same bytes.
    Mismatch,
    /// The buffered bytes are a valid prefix of this decoder's format but
    /// not yet decidable; more bytes are required.
    Incomplete,
}

/// A header decoder. Implementations must not report `Mismatch` or an error
/// for inputs that could still become valid with more bytes appended.
pub trait HeaderParser: Send + Sync {
    fn parse(&self, buf: &[u8]) -> Result<Parsed, ProxyError>;
}

/// Compare buffered bytes against a fixed signature prefix.
///
/// Returns `Some(true)` when the signature is fully present, `Some(false)`
/// when the buffer already diverges from it, and `None` while the buffer is
/// a strict prefix of the signature.
pub(crate) fn match_signature(buf: &[u8], signature: &[u8]) -> Option<bool> {
    let len = buf.len().min(signature.len());
    if buf[..len] != signature[..len] {
        return Some(false);
    }
    if buf.len() < signature.len() {
        return None;
    }
    Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_match_states() {
        assert_eq!(match_signature(b"", b"PROXY"), None);
        assert_eq!(match_signature(b"PRO", b"PROXY"), None);
        assert_eq!(match_signature(b"PROXY", b"PROXY"), Some(true));
        assert_eq!(match_signature(b"PROXY TCP4", b"PROXY"), Some(true));
        assert_eq!(match_signature(b"PROXz", b"PROXY"), Some(false));
        assert_eq!(match_signature(b"GET /", b"PROXY"), Some(false));
    }
}
