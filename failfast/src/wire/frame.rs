use core::fmt;

use super::{ipv4, tcp, Checksum, Result};

/// One raw network layer packet as read from or written to a tun device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a>(&'a [u8]);

/// A frame decoded into its headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPacket<'a> {
    /// The network layer header.
    pub ip: ipv4::Repr,
    /// The transport layer, if the packet carried TCP.
    pub tcp: Option<Segment<'a>>,
}

/// A TCP header with the payload it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    /// The parsed header, options are skipped.
    pub repr: tcp::Repr,
    /// The segment payload.
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Wrap the bytes of a single packet.
    pub fn new(bytes: &'a [u8]) -> Self {
        Frame(bytes)
    }

    /// The IP version from the first nibble, if there is a first octet.
    pub fn version(&self) -> Option<u8> {
        self.0.first().map(|ver_ihl| ver_ihl >> 4)
    }

    /// Decode the network and, for TCP, the transport layer.
    ///
    /// Anything that is not IPv4 is `Error::Unrecognized`. A packet of another transport
    /// protocol decodes successfully but without a segment.
    pub fn decode(&self, checksum: Checksum) -> Result<ParsedPacket<'a>> {
        let packet = ipv4::Packet::new_unchecked(self.0);
        let ip = ipv4::Repr::parse(&packet, checksum)?;

        if ip.protocol != ipv4::Protocol::Tcp {
            return Ok(ParsedPacket { ip, tcp: None });
        }

        let segment = tcp::Packet::new_unchecked(packet.payload_slice());
        let repr = tcp::Repr::parse(&segment, ip.src_addr, ip.dst_addr, checksum)?;

        Ok(ParsedPacket {
            ip,
            tcp: Some(Segment {
                repr,
                payload: segment.payload_slice(),
            }),
        })
    }
}

/// Serialize an IPv4 and a TCP header followed by the payload.
///
/// Lengths are derived from the payload, so `payload_len` of either representation is ignored.
/// Both the IPv4 header checksum and the TCP checksum, which covers the pseudo header, are
/// computed.
pub fn encode(ip: &ipv4::Repr, tcp: &tcp::Repr, payload: &[u8]) -> Vec<u8> {
    let tcp = tcp::Repr { payload_len: payload.len(), ..*tcp };
    let ip = ipv4::Repr { payload_len: tcp.buffer_len(), ..*ip };

    let mut buffer = vec![0; ip.buffer_len() + ip.payload_len];
    let mut packet = ipv4::Packet::new_unchecked(&mut buffer[..]);
    ip.emit(&mut packet, Checksum::Manual);

    let mut segment = tcp::Packet::new_unchecked(packet.payload_mut_slice());
    tcp.emit(&mut segment);
    segment.payload_mut_slice().copy_from_slice(payload);
    segment.fill_checksum(ip.src_addr, ip.dst_addr);

    buffer
}

impl fmt::Display for ParsedPacket<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.ip)?;
        if let Some(segment) = &self.tcp {
            write!(f, " {}", segment.repr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::net::Ipv4Addr;
    use super::*;
    use crate::wire::Error;
    use crate::wire::tcp::{Flags, SeqNumber};

    const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 1, 0, 10);
    const PEER: Ipv4Addr = Ipv4Addr::new(10, 1, 0, 20);

    fn reply_headers() -> (ipv4::Repr, tcp::Repr) {
        let ip = ipv4::Repr {
            src_addr: PEER,
            dst_addr: CLIENT,
            protocol: ipv4::Protocol::Tcp,
            payload_len: 0,
            hop_limit: ipv4::DEFAULT_HOP_LIMIT,
        };
        let tcp = tcp::Repr {
            src_port: 1000,
            dst_port: 40000,
            flags: Flags::ACK,
            seq_number: SeqNumber(2),
            ack_number: Some(SeqNumber(9)),
            window_len: 512,
            payload_len: 0,
        };
        (ip, tcp)
    }

    #[test]
    fn encode_fills_lengths_and_checksums() {
        let (ip, tcp) = reply_headers();
        let bytes = encode(&ip, &tcp, b"pong");
        assert_eq!(bytes.len(), 20 + 20 + 4);

        let packet = ipv4::Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.total_len(), 44);
        assert!(packet.verify_checksum());

        let segment = tcp::Packet::new_checked(packet.payload_slice()).unwrap();
        assert!(segment.verify_checksum(PEER, CLIENT));
        assert_eq!(segment.payload_slice(), b"pong");
    }

    #[test]
    fn decode_encoded() {
        let (ip, tcp) = reply_headers();
        let bytes = encode(&ip, &tcp, &[]);
        let parsed = Frame::new(&bytes).decode(Checksum::Manual).unwrap();

        assert_eq!(parsed.ip, ipv4::Repr { payload_len: 20, ..ip });
        let segment = parsed.tcp.unwrap();
        assert_eq!(segment.repr, tcp);
        assert!(segment.payload.is_empty());
    }

    #[test]
    fn decode_not_tcp() {
        // ICMP echo request with four octets of payload.
        let bytes = [
            0x45, 0x00, 0x00, 0x18, 0x12, 0x34, 0x40, 0x00,
            0x40, 0x01, 0x14, 0x92, 0x0a, 0x01, 0x00, 0x0a,
            0x0a, 0x01, 0x00, 0x14, 0xde, 0xad, 0xbe, 0xef,
        ];
        let parsed = Frame::new(&bytes).decode(Checksum::Manual).unwrap();
        assert_eq!(parsed.ip.protocol, ipv4::Protocol::Icmp);
        assert!(parsed.tcp.is_none());
    }

    #[test]
    fn decode_ipv6_unrecognized() {
        // Start of a router solicitation the kernel sends for a new link.
        let bytes = [
            0x60, 0x00, 0x00, 0x00, 0x00, 0x10, 0x3a, 0xff,
        ];
        let frame = Frame::new(&bytes);
        assert_eq!(frame.version(), Some(6));
        assert_eq!(frame.decode(Checksum::Manual), Err(Error::Unrecognized));
    }

    #[test]
    fn decode_corrupt() {
        let (ip, tcp) = reply_headers();
        let mut bytes = encode(&ip, &tcp, b"pong");
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert_eq!(Frame::new(&bytes).decode(Checksum::Manual), Err(Error::WrongChecksum));
        assert_eq!(Frame::new(&bytes[..30]).decode(Checksum::Manual), Err(Error::Truncated));
        assert_eq!(Frame::new(&[]).decode(Checksum::Manual), Err(Error::Truncated));
    }

    #[test]
    fn display() {
        let (ip, tcp) = reply_headers();
        let bytes = encode(&ip, &tcp, &[]);
        let parsed = Frame::new(&bytes).decode(Checksum::Manual).unwrap();
        assert_eq!(
            parsed.to_string(),
            "IPv4 src=10.1.0.20 dst=10.1.0.10 proto=TCP TCP src=1000 dst=40000 ACK seq=2 ack=9 win=512 len=0");
    }
}
