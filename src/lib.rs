//! HAProxy PROXY protocol (v1 text and v2 binary) receiver.
//!
//! Recovers the original client/destination addresses that a load balancer
//! prepends to the byte stream, and exposes connections that behave exactly
//! like the underlying transport except for the reported addresses.
//!
//! The header is resolved lazily, exactly once per connection, on the first
//! read or address query; bytes probed during format detection are buffered
//! and re-delivered to the application, never read twice from the socket.
//!
//! ```no_run
//! use proxyprotocol::Listener;
//! use tokio::io::AsyncReadExt;
//!
//! # async fn serve() -> std::io::Result<()> {
//! let raw = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! let listener = Listener::new(raw);
//! loop {
//!     let mut conn = listener.accept().await?;
//!     // Original client address, not the balancer hop.
//!     let peer = conn.peer_addr().await;
//!     let mut buf = [0u8; 1024];
//!     let n = conn.read(&mut buf).await?;
//!     println!("{} sent {} bytes", peer, n);
//! }
//! # }
//! ```

pub mod config;
pub mod conn;
pub mod error;
pub mod header;
pub mod listener;
pub mod parser;
pub mod wire;

pub use config::ProxyConfig;
pub use conn::Conn;
pub use error::ProxyError;
pub use header::Header;
pub use listener::{Listener, SourceCheck};
pub use parser::{BinaryParser, FallbackParser, HeaderParser, Parsed, StubParser, TextParser};
