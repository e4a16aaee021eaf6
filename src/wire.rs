//! Wire-level constants shared by the v1 and v2 decoders.
//!
//! Reference: <https://www.haproxy.org/download/2.0/doc/proxy-protocol.txt>

/// PROXY v1 signature: the first bytes of the text header line.
pub const TEXT_SIGNATURE: &[u8] = b"PROXY";

/// Field separator in the v1 header line.
pub const TEXT_SEPARATOR: char = ' ';

/// Maximum v1 header line length including CRLF (per the HAProxy spec).
pub const TEXT_MAX_LINE: usize = 107;

/// Protocol keywords accepted in a v1 header line.
pub const TEXT_PROTOCOL_IPV4: &str = "TCP4";
pub const TEXT_PROTOCOL_IPV6: &str = "TCP6";
pub const TEXT_PROTOCOL_UNKNOWN: &str = "UNKNOWN";

/// PROXY v2 signature (12 bytes).
pub const BINARY_SIGNATURE: [u8; 12] = [
    0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, 0x51, 0x55, 0x49, 0x54, 0x0A,
];

/// Fixed v2 prefix: signature + version/command + family/protocol + length.
pub const BINARY_PREFIX_LEN: usize = BINARY_SIGNATURE.len() + 4;

/// Top nibble of byte 13 selects the protocol version.
pub const BINARY_VERSION_MASK: u8 = 0xF0;
pub const BINARY_VERSION_2: u8 = 0x20;

/// Low nibble of byte 13 selects the command.
pub const BINARY_COMMAND_MASK: u8 = 0x0F;
pub const BINARY_COMMAND_LOCAL: u8 = 0x00;
pub const BINARY_COMMAND_PROXY: u8 = 0x01;

/// Top nibble of byte 14 selects the address family.
pub const BINARY_FAMILY_MASK: u8 = 0xF0;
pub const BINARY_FAMILY_UNSPEC: u8 = 0x00;
pub const BINARY_FAMILY_INET: u8 = 0x10;
pub const BINARY_FAMILY_INET6: u8 = 0x20;

/// Ports are 2-byte big-endian integers in the v2 address block.
pub const BINARY_PORT_LEN: usize = 2;

/// Minimum address-block sizes for the PROXY command:
/// `2 * (ip_len + port_len)`. Anything beyond is an uninterpreted TLV tail.
pub const BINARY_INET_BLOCK: usize = 2 * (4 + BINARY_PORT_LEN);
pub const BINARY_INET6_BLOCK: usize = 2 * (16 + BINARY_PORT_LEN);

/// Default read-ahead buffer size: comfortably larger than any header the
/// decoders accept, and the same bytes later serve the first application read.
pub const DEFAULT_READ_AHEAD: usize = 1400;
