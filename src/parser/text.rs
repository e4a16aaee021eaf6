//! PROXY v1 (text) decoder.
//!
//! Format: `"PROXY" SP protocol SP src-ip SP dst-ip SP src-port SP dst-port CRLF`
//! with protocol one of TCP4, TCP6, UNKNOWN.

use std::net::{IpAddr, SocketAddr};

use tracing::debug;

use super::{match_signature, HeaderParser, Parsed};
use crate::error::ProxyError;
use crate::header::Header;
use crate::wire;

/// Number of address fields following the protocol keyword.
const ADDRESS_FIELDS: usize = 4;

/// Line-oriented decoder for the v1 text header.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextParser;

impl TextParser {
    pub fn new() -> Self {
        TextParser
    }
}

impl HeaderParser for TextParser {
    fn parse(&self, buf: &[u8]) -> Result<Parsed, ProxyError> {
        match match_signature(buf, wire::TEXT_SIGNATURE) {
            Some(true) => {}
            Some(false) => return Ok(Parsed::Mismatch),
            None => return Ok(Parsed::Incomplete),
        }

        // The line must terminate within the spec's maximum header length.
        let window = &buf[..buf.len().min(wire::TEXT_MAX_LINE)];
        let line_end = match window.iter().position(|&b| b == b'\n') {
            Some(pos) => pos,
            None if buf.len() >= wire::TEXT_MAX_LINE => return Err(ProxyError::HeaderTooLong),
            None => return Ok(Parsed::Incomplete),
        };
        let consumed = line_end + 1;

        let mut line = &buf[..line_end];
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }
        let line = String::from_utf8_lossy(line);

        let mut fields = line.split(wire::TEXT_SEPARATOR);
        let _signature = fields.next();
        let protocol = fields.next().ok_or(ProxyError::InvalidAddressList)?;

        match protocol {
            wire::TEXT_PROTOCOL_UNKNOWN => {
                debug!("v1 UNKNOWN protocol, keeping transport addresses");
                Ok(Parsed::Complete {
                    header: None,
                    consumed,
                })
            }
            wire::TEXT_PROTOCOL_IPV4 | wire::TEXT_PROTOCOL_IPV6 => {
                let address_fields: Vec<&str> = fields.collect();
                if address_fields.len() != ADDRESS_FIELDS {
                    return Err(ProxyError::InvalidAddressList);
                }

                let src_ip = parse_ip(address_fields[0])?;
                let dst_ip = parse_ip(address_fields[1])?;
                let src_port = parse_port(address_fields[2])?;
                let dst_port = parse_port(address_fields[3])?;

                let header = Header {
                    src: SocketAddr::new(src_ip, src_port),
                    dst: SocketAddr::new(dst_ip, dst_port),
                };
                debug!(src = %header.src, dst = %header.dst, "v1 header parsed");
                Ok(Parsed::Complete {
                    header: Some(header),
                    consumed,
                })
            }
            other => Err(ProxyError::UnknownProtocol(other.to_string())),
        }
    }
}

// Both textual IP forms are accepted under either TCP4/TCP6 keyword; the
// keyword is not cross-checked against the parsed address family.
fn parse_ip(field: &str) -> Result<IpAddr, ProxyError> {
    field
        .parse()
        .map_err(|_| ProxyError::InvalidIp(field.to_string()))
}

fn parse_port(field: &str) -> Result<u16, ProxyError> {
    field
        .parse()
        .map_err(|_| ProxyError::InvalidPort(field.to_string()))
}
