//! Ordered-fallback dispatch over several decoders, plus the terminal stub.

use tracing::debug;

use super::{BinaryParser, HeaderParser, Parsed, TextParser};
use crate::error::ProxyError;

/// Terminal decoder: always resolves without a header and consumes nothing.
/// Placed last in the default chain it turns "no known signature" into "use
/// the transport-level addresses" instead of an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubParser;

impl StubParser {
    pub fn new() -> Self {
        StubParser
    }
}

impl HeaderParser for StubParser {
    fn parse(&self, _buf: &[u8]) -> Result<Parsed, ProxyError> {
        Ok(Parsed::Complete {
            header: None,
            consumed: 0,
        })
    }
}

/// Tries decoders in order against the same buffered bytes.
///
/// A `Mismatch` moves on to the next decoder; anything else is final.
/// `Incomplete` propagates before later decoders run, so a decoder whose
/// signature may still match keeps its claim on the stream.
pub struct FallbackParser {
    parsers: Vec<Box<dyn HeaderParser>>,
}

impl FallbackParser {
    /// Chain with a custom decoder order. An embedder that omits the stub
    /// turns unrecognized streams into [`ProxyError::InvalidHeader`].
    pub fn new(parsers: Vec<Box<dyn HeaderParser>>) -> Self {
        FallbackParser { parsers }
    }
}

impl Default for FallbackParser {
    /// The default chain: text, binary, then the stub safety net.
    fn default() -> Self {
        FallbackParser::new(vec![
            Box::new(TextParser::new()),
            Box::new(BinaryParser::new()),
            Box::new(StubParser::new()),
        ])
    }
}

impl HeaderParser for FallbackParser {
    fn parse(&self, buf: &[u8]) -> Result<Parsed, ProxyError> {
        for parser in &self.parsers {
            match parser.parse(buf)? {
                Parsed::Mismatch => continue,
                outcome => return Ok(outcome),
            }
        }
        debug!("no decoder recognized the stream");
        Err(ProxyError::InvalidHeader)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::header::Header;

    /// Counts invocations before delegating to a fixed outcome.
    struct Recording {
        calls: Arc<AtomicUsize>,
        outcome: Parsed,
    }

    impl HeaderParser for Recording {
        fn parse(&self, _buf: &[u8]) -> Result<Parsed, ProxyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.outcome.clone())
        }
    }

    #[test]
    fn default_chain_resolves_unrecognized_stream_without_header() {
        let parser = FallbackParser::default();
        assert_eq!(
            parser.parse(b"GET / HTTP/1.0\r\n").unwrap(),
            Parsed::Complete {
                header: None,
                consumed: 0,
            },
        );
    }

    #[test]
    fn default_chain_decodes_text() {
        let parser = FallbackParser::default();
        let data = b"PROXY TCP4 1.2.3.4 5.6.7.8 80 81\r\n";
        match parser.parse(data).unwrap() {
            Parsed::Complete {
                header: Some(Header { src, .. }),
                consumed,
            } => {
                assert_eq!(src, "1.2.3.4:80".parse().unwrap());
                assert_eq!(consumed, data.len());
            }
            other => panic!("expected a decoded header, got {:?}", other),
        }
    }

    #[test]
    fn hard_error_stops_the_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let parser = FallbackParser::new(vec![
            Box::new(TextParser::new()),
            Box::new(Recording {
                calls: calls.clone(),
                outcome: Parsed::Mismatch,
            }),
        ]);

        // Recognized text signature with a bad keyword: the error must
        // propagate instead of falling through to later decoders.
        let result = parser.parse(b"PROXY UDP4 1.2.3.4 5.6.7.8 80 81\r\n");
        assert!(matches!(result, Err(ProxyError::UnknownProtocol(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn incomplete_propagates_before_later_decoders() {
        let calls = Arc::new(AtomicUsize::new(0));
        let parser = FallbackParser::new(vec![
            Box::new(TextParser::new()),
            Box::new(Recording {
                calls: calls.clone(),
                outcome: Parsed::Complete {
                    header: None,
                    consumed: 0,
                },
            }),
        ]);

        // "PRO" may still become the text signature; the stub-like second
        // decoder must not win the stream yet.
        assert_eq!(parser.parse(b"PRO").unwrap(), Parsed::Incomplete);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn first_resolution_wins() {
        let later = Arc::new(AtomicUsize::new(0));
        let parser = FallbackParser::new(vec![
            Box::new(StubParser::new()),
            Box::new(Recording {
                calls: later.clone(),
                outcome: Parsed::Mismatch,
            }),
        ]);

        assert_eq!(
            parser.parse(b"anything").unwrap(),
            Parsed::Complete {
                header: None,
                consumed: 0,
            },
        );
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn exhausted_chain_without_stub_is_an_error() {
        let parser = FallbackParser::new(vec![
            Box::new(TextParser::new()),
            Box::new(BinaryParser::new()),
        ]);
        assert!(matches!(
            parser.parse(b"GET / HTTP/1.0\r\n"),
            Err(ProxyError::InvalidHeader),
        ));
    }

    #[test]
    fn empty_chain_is_an_error() {
        let parser = FallbackParser::new(Vec::new());
        assert!(matches!(
            parser.parse(b"anything"),
            Err(ProxyError::InvalidHeader),
        ));
    }
}
