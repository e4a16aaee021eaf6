//! Round-trip properties: any valid (address, port) pair encoded as a v1
//! line or v2 record decodes to an identical header, with the stream left
//! positioned at the first application byte. Encoding lives here only; the
//! library itself is receive-only.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use proptest::prelude::*;

use proxyprotocol::wire;
use proxyprotocol::{FallbackParser, Header, HeaderParser, Parsed};

fn sockaddr4() -> impl Strategy<Value = SocketAddr> {
    (any::<u32>(), any::<u16>())
        .prop_map(|(ip, port)| SocketAddr::new(Ipv4Addr::from(ip).into(), port))
}

fn sockaddr6() -> impl Strategy<Value = SocketAddr> {
    (any::<u128>(), any::<u16>())
        .prop_map(|(ip, port)| SocketAddr::new(Ipv6Addr::from(ip).into(), port))
}

fn encode_v1(header: &Header) -> Vec<u8> {
    let protocol = if header.src.is_ipv4() { "TCP4" } else { "TCP6" };
    format!(
        "PROXY {} {} {} {} {}\r\n",
        protocol,
        header.src.ip(),
        header.dst.ip(),
        header.src.port(),
        header.dst.port()
    )
    .into_bytes()
}

fn encode_v2(header: &Header, tlv_tail: &[u8]) -> Vec<u8> {
    let mut block = Vec::new();
    let family = match (header.src, header.dst) {
        (SocketAddr::V4(src), SocketAddr::V4(dst)) => {
            block.extend_from_slice(&src.ip().octets());
            block.extend_from_slice(&dst.ip().octets());
            0x11
        }
        (SocketAddr::V6(src), SocketAddr::V6(dst)) => {
            block.extend_from_slice(&src.ip().octets());
            block.extend_from_slice(&dst.ip().octets());
            0x21
        }
        _ => unreachable!("strategies generate same-family pairs"),
    };
    block.extend_from_slice(&header.src.port().to_be_bytes());
    block.extend_from_slice(&header.dst.port().to_be_bytes());
    block.extend_from_slice(tlv_tail);

    let mut data = wire::BINARY_SIGNATURE.to_vec();
    data.push(0x21);
    data.push(family);
    data.extend_from_slice(&(block.len() as u16).to_be_bytes());
    data.extend_from_slice(&block);
    data
}

fn decode(data: &[u8]) -> (Header, usize) {
    match FallbackParser::default().parse(data) {
        Ok(Parsed::Complete {
            header: Some(header),
            consumed,
        }) => (header, consumed),
        other => panic!("expected a decoded header, got {:?}", other),
    }
}

proptest! {
    #[test]
    fn v1_roundtrip_ipv4((src, dst) in (sockaddr4(), sockaddr4())) {
        let header = Header { src, dst };
        let mut data = encode_v1(&header);
        data.extend_from_slice(b"payload");

        let (decoded, consumed) = decode(&data);
        prop_assert_eq!(decoded, header);
        prop_assert_eq!(&data[consumed..], b"payload");
    }

    #[test]
    fn v1_roundtrip_ipv6((src, dst) in (sockaddr6(), sockaddr6())) {
        let header = Header { src, dst };
        let data = encode_v1(&header);

        let (decoded, consumed) = decode(&data);
        prop_assert_eq!(decoded, header);
        prop_assert_eq!(consumed, data.len());
    }

    #[test]
    fn v2_roundtrip_ipv4((src, dst) in (sockaddr4(), sockaddr4())) {
        let header = Header { src, dst };
        let data = encode_v2(&header, &[]);

        let (decoded, consumed) = decode(&data);
        prop_assert_eq!(decoded, header);
        prop_assert_eq!(consumed, data.len());
    }

    #[test]
    fn v2_roundtrip_ipv6((src, dst) in (sockaddr6(), sockaddr6())) {
        let header = Header { src, dst };
        let data = encode_v2(&header, &[]);

        let (decoded, consumed) = decode(&data);
        prop_assert_eq!(decoded, header);
        prop_assert_eq!(consumed, data.len());
    }

    #[test]
    fn v2_tlv_tail_never_changes_the_header(
        (src, dst) in (sockaddr4(), sockaddr4()),
        tail in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let header = Header { src, dst };

        let bare = encode_v2(&header, &[]);
        let mut tailed = encode_v2(&header, &tail);
        tailed.extend_from_slice(b"app");

        let (decoded_bare, _) = decode(&bare);
        let (decoded_tailed, consumed) = decode(&tailed);
        prop_assert_eq!(decoded_bare, decoded_tailed);
        prop_assert_eq!(decoded_tailed, header);
        // The tail is consumed with the header, leaving the stream at the
        // first application byte.
        prop_assert_eq!(&tailed[consumed..], b"app");
    }
}
