//! PROXY v2 (binary) decoder.
//!
//! Layout: `signature(12) | version_command(1) | family_protocol(1) |
//! length(2, BE) | address-block(length)`. Exactly `16 + length` bytes are
//! consumed for every accepted record, so the stream stays positioned at the
//! first application byte even when the address block is discarded (LOCAL,
//! UNSPEC) or carries a TLV tail.

use std::net::{IpAddr, SocketAddr};

use tracing::debug;

use super::{match_signature, HeaderParser, Parsed};
use crate::error::ProxyError;
use crate::header::Header;
use crate::wire;

/// Decoder for the v2 binary header.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryParser;

impl BinaryParser {
    pub fn new() -> Self {
        BinaryParser
    }
}

impl HeaderParser for BinaryParser {
    fn parse(&self, buf: &[u8]) -> Result<Parsed, ProxyError> {
        match match_signature(buf, &wire::BINARY_SIGNATURE) {
            Some(true) => {}
            Some(false) => return Ok(Parsed::Mismatch),
            None => return Ok(Parsed::Incomplete),
        }

        if buf.len() < wire::BINARY_PREFIX_LEN {
            return Ok(Parsed::Incomplete);
        }

        let version_command = buf[12];
        if version_command & wire::BINARY_VERSION_MASK != wire::BINARY_VERSION_2 {
            return Err(ProxyError::UnknownVersion(version_command));
        }
        let command = version_command & wire::BINARY_COMMAND_MASK;
        if command != wire::BINARY_COMMAND_LOCAL && command != wire::BINARY_COMMAND_PROXY {
            return Err(ProxyError::UnknownCommand(version_command));
        }

        let block_len = u16::from_be_bytes([buf[14], buf[15]]) as usize;
        let consumed = wire::BINARY_PREFIX_LEN + block_len;
        if buf.len() < consumed {
            return Ok(Parsed::Incomplete);
        }
        let block = &buf[wire::BINARY_PREFIX_LEN..consumed];

        if command == wire::BINARY_COMMAND_LOCAL {
            debug!(block_len, "v2 LOCAL command, keeping transport addresses");
            return Ok(Parsed::Complete {
                header: None,
                consumed,
            });
        }

        let family_protocol = buf[13];
        let header = match family_protocol & wire::BINARY_FAMILY_MASK {
            wire::BINARY_FAMILY_UNSPEC => {
                debug!("v2 UNSPEC family, keeping transport addresses");
                None
            }
            wire::BINARY_FAMILY_INET => Some(parse_addresses::<4>(block)?),
            wire::BINARY_FAMILY_INET6 => Some(parse_addresses::<16>(block)?),
            family => {
                return Err(ProxyError::UnknownProtocol(format!(
                    "family {:#04x}",
                    family >> 4
                )))
            }
        };

        if let Some(header) = &header {
            debug!(src = %header.src, dst = %header.dst, "v2 header parsed");
        }
        Ok(Parsed::Complete { header, consumed })
    }
}

/// Decode `src-ip | dst-ip | src-port | dst-port` from the address block.
/// Bytes beyond the fixed layout are a TLV tail and are left uninterpreted.
fn parse_addresses<const IP_LEN: usize>(block: &[u8]) -> Result<Header, ProxyError>
where
    IpAddr: From<[u8; IP_LEN]>,
{
    let expected = 2 * (IP_LEN + wire::BINARY_PORT_LEN);
    if block.len() < expected {
        return Err(ProxyError::UnexpectedAddressLen {
            expected,
            actual: block.len(),
        });
    }

    let mut src_ip = [0u8; IP_LEN];
    src_ip.copy_from_slice(&block[..IP_LEN]);
    let mut dst_ip = [0u8; IP_LEN];
    dst_ip.copy_from_slice(&block[IP_LEN..2 * IP_LEN]);

    let ports = &block[2 * IP_LEN..];
    let src_port = u16::from_be_bytes([ports[0], ports[1]]);
    let dst_port = u16::from_be_bytes([ports[2], ports[3]]);

    Ok(Header {
        src: SocketAddr::new(src_ip.into(), src_port),
        dst: SocketAddr::new(dst_ip.into(), dst_port),
    })
}
