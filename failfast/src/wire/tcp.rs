// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//! The Transmission Control Protocol segment header.
use core::{cmp, fmt, ops};
use std::net::Ipv4Addr;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Checksum, Error, Result};
use super::ip::{checksum, Protocol};

/// A TCP sequence number.
///
/// A sequence number is a monotonically advancing integer modulo 2<sup>32</sup>.
/// Sequence numbers do not have a discontiguity when compared pairwise across a signed overflow.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct SeqNumber(pub i32);

impl SeqNumber {
    /// The sequence number with the bit pattern of `value`.
    pub const fn from_u32(value: u32) -> Self {
        SeqNumber(value as i32)
    }

    /// The raw value as seen on the wire.
    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

impl ops::Add<usize> for SeqNumber {
    type Output = SeqNumber;

    fn add(self, rhs: usize) -> SeqNumber {
        if rhs > i32::MAX as usize {
            panic!("attempt to add to sequence number with unsigned overflow")
        }
        SeqNumber(self.0.wrapping_add(rhs as i32))
    }
}

impl ops::AddAssign<usize> for SeqNumber {
    fn add_assign(&mut self, rhs: usize) {
        *self = *self + rhs;
    }
}

impl cmp::PartialOrd for SeqNumber {
    fn partial_cmp(&self, other: &SeqNumber) -> Option<cmp::Ordering> {
        self.0.wrapping_sub(other.0).partial_cmp(&0)
    }
}

/// A set of tcp flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flags(pub u16);

mod field {
    use crate::wire::field::Field;

    pub(crate) const SRC_PORT: Field = 0..2;
    pub(crate) const DST_PORT: Field = 2..4;
    pub(crate) const SEQ_NUM:  Field = 4..8;
    pub(crate) const ACK_NUM:  Field = 8..12;
    pub(crate) const FLAGS:    Field = 12..14;
    pub(crate) const WIN_SIZE: Field = 14..16;
    pub(crate) const CHECKSUM: Field = 16..18;
    pub(crate) const URGENT:   Field = 18..20;

    pub(crate) const FLG_FIN: u16 = 0x001;
    pub(crate) const FLG_SYN: u16 = 0x002;
    pub(crate) const FLG_RST: u16 = 0x004;
    pub(crate) const FLG_PSH: u16 = 0x008;
    pub(crate) const FLG_ACK: u16 = 0x010;
}

/// The length of a TCP header without options.
pub const HEADER_LEN: usize = field::URGENT.end;

impl Flags {
    /// A lone `SYN`.
    pub const SYN: Flags = Flags(field::FLG_SYN);
    /// A lone `ACK`.
    pub const ACK: Flags = Flags(field::FLG_ACK);
    /// The second step of the handshake.
    pub const SYN_ACK: Flags = Flags(field::FLG_SYN | field::FLG_ACK);

    /// Return the FIN flag.
    #[inline]
    pub fn fin(self) -> bool {
        self.0 & field::FLG_FIN != 0
    }

    /// Return the SYN flag.
    #[inline]
    pub fn syn(self) -> bool {
        self.0 & field::FLG_SYN != 0
    }

    /// Return the RST flag.
    #[inline]
    pub fn rst(self) -> bool {
        self.0 & field::FLG_RST != 0
    }

    /// Return the PSH flag.
    #[inline]
    pub fn psh(self) -> bool {
        self.0 & field::FLG_PSH != 0
    }

    /// Return the ACK flag.
    #[inline]
    pub fn ack(self) -> bool {
        self.0 & field::FLG_ACK != 0
    }

    /// Set the FIN flag.
    #[inline]
    pub fn set_fin(&mut self, value: bool) {
        self.set(field::FLG_FIN, value)
    }

    /// Set the RST flag.
    #[inline]
    pub fn set_rst(&mut self, value: bool) {
        self.set(field::FLG_RST, value)
    }

    /// Set the ACK flag.
    #[inline]
    pub fn set_ack(&mut self, value: bool) {
        self.set(field::FLG_ACK, value)
    }

    fn set(&mut self, mask: u16, value: bool) {
        if value {
            self.0 |= mask
        } else {
            self.0 &= !mask
        }
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = [
            (self.syn(), "SYN"),
            (self.fin(), "FIN"),
            (self.rst(), "RST"),
            (self.psh(), "PSH"),
            (self.ack(), "ACK"),
        ];
        let mut first = true;
        for (_, name) in names.iter().filter(|(set, _)| *set) {
            if !first { write!(f, "|")?; }
            write!(f, "{}", name)?;
            first = false;
        }
        if first {
            write!(f, "-")?;
        }
        Ok(())
    }
}

/// A read/write wrapper around a Transmission Control Protocol packet buffer.
#[derive(Debug, PartialEq, Clone)]
pub struct Packet<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Imbue a raw octet buffer with TCP packet structure.
    pub fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no header accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    /// Returns `Err(Error::Malformed)` if the header length field has a value smaller
    /// than the minimal header length.
    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if len < field::URGENT.end {
            Err(Error::Truncated)
        } else {
            let header_len = usize::from(self.header_len());
            if len < header_len {
                Err(Error::Truncated)
            } else if header_len < field::URGENT.end {
                Err(Error::Malformed)
            } else {
                Ok(())
            }
        }
    }

    /// Return the source port field.
    #[inline]
    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::SRC_PORT])
    }

    /// Return the destination port field.
    #[inline]
    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::DST_PORT])
    }

    /// Return the sequence number field.
    #[inline]
    pub fn seq_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_i32(&self.buffer.as_ref()[field::SEQ_NUM]))
    }

    /// Return the acknowledgement number field.
    #[inline]
    pub fn ack_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_i32(&self.buffer.as_ref()[field::ACK_NUM]))
    }

    /// Read all flags at once.
    #[inline]
    pub fn flags(&self) -> Flags {
        Flags(NetworkEndian::read_u16(&self.buffer.as_ref()[field::FLAGS]) & 0x1ff)
    }

    /// Return the header length, in octets.
    #[inline]
    pub fn header_len(&self) -> u8 {
        let raw = NetworkEndian::read_u16(&self.buffer.as_ref()[field::FLAGS]);
        ((raw >> 12) * 4) as u8
    }

    /// Return the window size field.
    #[inline]
    pub fn window_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::WIN_SIZE])
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::CHECKSUM])
    }

    /// Validate the packet checksum against the IPv4 pseudo header.
    pub fn verify_checksum(&self, src_addr: Ipv4Addr, dst_addr: Ipv4Addr) -> bool {
        let data = self.buffer.as_ref();
        checksum::combine(&[
            checksum::pseudo_header(src_addr, dst_addr, Protocol::Tcp, data.len() as u32),
            checksum::data(data)
        ]) == !0
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Packet<&'a T> {
    /// Return a pointer to the payload.
    #[inline]
    pub fn payload_slice(&self) -> &'a [u8] {
        let header_len = usize::from(self.header_len());
        &self.buffer.as_ref()[header_len..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the source port field.
    #[inline]
    pub fn set_src_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::SRC_PORT], value)
    }

    /// Set the destination port field.
    #[inline]
    pub fn set_dst_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::DST_PORT], value)
    }

    /// Set the sequence number field.
    #[inline]
    pub fn set_seq_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_i32(&mut self.buffer.as_mut()[field::SEQ_NUM], value.0)
    }

    /// Set the acknowledgement number field.
    #[inline]
    pub fn set_ack_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_i32(&mut self.buffer.as_mut()[field::ACK_NUM], value.0)
    }

    /// Set a combination of flags, keeping the header length.
    #[inline]
    pub fn set_flags(&mut self, Flags(flags): Flags) {
        let data = self.buffer.as_mut();
        let field = NetworkEndian::read_u16(&data[field::FLAGS]) & !0xfff;
        NetworkEndian::write_u16(&mut data[field::FLAGS], field | (flags & 0x1ff))
    }

    /// Set the header length, in octets.
    #[inline]
    pub fn set_header_len(&mut self, value: u8) {
        let data = self.buffer.as_mut();
        let raw = NetworkEndian::read_u16(&data[field::FLAGS]);
        let raw = (raw & !0xf000) | ((value as u16) / 4) << 12;
        NetworkEndian::write_u16(&mut data[field::FLAGS], raw)
    }

    /// Set the window size field.
    #[inline]
    pub fn set_window_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::WIN_SIZE], value)
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::CHECKSUM], value)
    }

    /// Set the urgent pointer field.
    #[inline]
    pub fn set_urgent_at(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::URGENT], value)
    }

    /// Compute and fill in the checksum over the pseudo header, header and payload.
    pub fn fill_checksum(&mut self, src_addr: Ipv4Addr, dst_addr: Ipv4Addr) {
        self.set_checksum(0);
        let checksum = {
            let data = self.buffer.as_ref();
            !checksum::combine(&[
                checksum::pseudo_header(src_addr, dst_addr, Protocol::Tcp, data.len() as u32),
                checksum::data(data)
            ])
        };
        self.set_checksum(checksum)
    }

    /// Return a mutable pointer to the payload data.
    #[inline]
    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        let header_len = usize::from(self.header_len());
        &mut self.buffer.as_mut()[header_len..]
    }
}

/// A high-level representation of a Transmission Control Protocol header.
///
/// Options are skipped when parsing and never emitted.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    /// The source port.
    pub src_port:    u16,
    /// The destination port.
    pub dst_port:    u16,
    /// The set of flags.
    pub flags:       Flags,
    /// The sequence number of the first octet of the segment.
    pub seq_number:  SeqNumber,
    /// The acknowledgment number, if the `ACK` flag is set.
    pub ack_number:  Option<SeqNumber>,
    /// The unscaled receive window.
    pub window_len:  u16,
    /// The number of payload octets.
    pub payload_len: usize,
}

impl Repr {
    /// Parse a Transmission Control Protocol packet and return a high-level representation.
    ///
    /// The checksum is verified against the pseudo header of the addresses when `checksum` is
    /// `Checksum::Manual`.
    pub fn parse<T: AsRef<[u8]> + ?Sized>(
        packet: &Packet<&T>,
        src_addr: Ipv4Addr,
        dst_addr: Ipv4Addr,
        checksum: Checksum,
    ) -> Result<Repr> {
        packet.check_len()?;

        // Source and destination ports must be present.
        if packet.src_port() == 0 { return Err(Error::Malformed) }
        if packet.dst_port() == 0 { return Err(Error::Malformed) }
        // Valid checksum is expected.
        if checksum.manual() && !packet.verify_checksum(src_addr, dst_addr) {
            return Err(Error::WrongChecksum)
        }

        let flags = packet.flags();
        let ack_number = if flags.ack() {
            Some(packet.ack_number())
        } else {
            None
        };

        Ok(Repr {
            src_port:    packet.src_port(),
            dst_port:    packet.dst_port(),
            flags,
            seq_number:  packet.seq_number(),
            ack_number,
            window_len:  packet.window_len(),
            payload_len: packet.payload_slice().len(),
        })
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    /// Return the length of the header and payload.
    pub fn buffer_len(&self) -> usize {
        self.header_len() + self.payload_len
    }

    /// Emit a high-level representation into a Transmission Control Protocol packet.
    ///
    /// The checksum is left zeroed, fill it after the payload was written.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]>>(&self, packet: &mut Packet<T>) {
        let mut flags = self.flags;
        flags.set_ack(self.ack_number.is_some());

        packet.set_src_port(self.src_port);
        packet.set_dst_port(self.dst_port);
        packet.set_seq_number(self.seq_number);
        packet.set_ack_number(self.ack_number.unwrap_or_default());
        packet.set_window_len(self.window_len);
        packet.set_header_len(HEADER_LEN as u8);
        packet.set_flags(flags);
        packet.set_checksum(0);
        packet.set_urgent_at(0);
    }

    /// Return the length of the segment, in terms of sequence space.
    pub fn sequence_len(&self) -> usize {
        let mut len = self.payload_len;
        if self.flags.syn() { len += 1 }
        if self.flags.fin() { len += 1 }
        len
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TCP src={} dst={} {}", self.src_port, self.dst_port, self.flags)?;
        write!(f, " seq={}", self.seq_number)?;
        if let Some(ack_number) = self.ack_number {
            write!(f, " ack={}", ack_number)?;
        }
        write!(f, " win={}", self.window_len)?;
        write!(f, " len={}", self.payload_len)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SRC_ADDR: Ipv4Addr = Ipv4Addr::new(10, 1, 0, 10);
    const DST_ADDR: Ipv4Addr = Ipv4Addr::new(10, 1, 0, 20);

    // A SYN from 10.1.0.10:40000 to 10.1.0.20:1000 as sent by Linux, with MSS, SACK permitted,
    // timestamp and window scale options.
    static SYN_BYTES: [u8; 40] =
        [0x9c, 0x40, 0x03, 0xe8,
         0x8a, 0x3b, 0x7c, 0x01,
         0x00, 0x00, 0x00, 0x00,
         0xa0, 0x02, 0xfa, 0xf0,
         0x70, 0xf2, 0x00, 0x00,
         0x02, 0x04, 0x05, 0xb4,
         0x04, 0x02, 0x08, 0x0a,
         0x00, 0x3d, 0x21, 0x5b,
         0x00, 0x00, 0x00, 0x00,
         0x01, 0x03, 0x03, 0x07];

    // A data segment carrying `foobar\n`.
    static DATA_BYTES: [u8; 27] =
        [0x9c, 0x40, 0x03, 0xe8,
         0x8a, 0x3b, 0x7c, 0x02,
         0x00, 0x00, 0x00, 0x02,
         0x50, 0x18, 0xfa, 0xf0,
         0xb9, 0x08, 0x00, 0x00,
         b'f', b'o', b'o', b'b',
         b'a', b'r', b'\n'];

    #[test]
    fn deconstruct_syn() {
        let packet = Packet::new_checked(&SYN_BYTES[..]).unwrap();
        assert_eq!(packet.src_port(), 40000);
        assert_eq!(packet.dst_port(), 1000);
        assert_eq!(packet.seq_number(), SeqNumber::from_u32(0x8a3b7c01));
        assert_eq!(packet.header_len(), 40);
        assert!(packet.flags().syn());
        assert!(!packet.flags().ack());
        assert_eq!(packet.window_len(), 64240);
        assert!(packet.verify_checksum(SRC_ADDR, DST_ADDR));
        assert_eq!(packet.payload_slice(), &[]);
    }

    #[test]
    fn parse_data() {
        let packet = Packet::new_unchecked(&DATA_BYTES[..]);
        let repr = Repr::parse(&packet, SRC_ADDR, DST_ADDR, Checksum::Manual).unwrap();
        assert_eq!(repr, Repr {
            src_port: 40000,
            dst_port: 1000,
            flags: Flags(0x018),
            seq_number: SeqNumber::from_u32(0x8a3b7c02),
            ack_number: Some(SeqNumber(2)),
            window_len: 64240,
            payload_len: 7,
        });
        assert_eq!(packet.payload_slice(), b"foobar\n");
        assert_eq!(repr.sequence_len(), 7);
    }

    #[test]
    fn wrong_checksum() {
        let packet = Packet::new_unchecked(&DATA_BYTES[..]);
        // The pseudo header covers the addresses.
        assert_eq!(
            Repr::parse(&packet, SRC_ADDR, Ipv4Addr::new(10, 1, 0, 21), Checksum::Manual),
            Err(Error::WrongChecksum));
        assert!(Repr::parse(&packet, SRC_ADDR, Ipv4Addr::new(10, 1, 0, 21), Checksum::Ignored).is_ok());
    }

    #[test]
    fn truncated() {
        assert_eq!(Packet::new_checked(&SYN_BYTES[..19]).unwrap_err(), Error::Truncated);
        // The header claims 40 octets of header.
        assert_eq!(Packet::new_checked(&SYN_BYTES[..36]).unwrap_err(), Error::Truncated);
    }

    #[test]
    fn impossible_len() {
        let mut bytes = vec![0; 20];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        packet.set_header_len(12);
        assert_eq!(packet.check_len(), Err(Error::Malformed));
    }

    #[test]
    fn emit_syn_ack() {
        let repr = Repr {
            src_port: 1000,
            dst_port: 40000,
            flags: Flags::SYN,
            seq_number: SeqNumber(1),
            ack_number: Some(SeqNumber::from_u32(0x8a3b7c02)),
            window_len: 64240,
            payload_len: 0,
        };
        let mut bytes = vec![0xa5; repr.buffer_len()];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        repr.emit(&mut packet);
        packet.fill_checksum(DST_ADDR, SRC_ADDR);

        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert!(packet.verify_checksum(DST_ADDR, SRC_ADDR));
        let parsed = Repr::parse(&packet, DST_ADDR, SRC_ADDR, Checksum::Manual).unwrap();
        assert_eq!(parsed.flags, Flags::SYN_ACK);
        assert_eq!(parsed.ack_number, repr.ack_number);
        assert_eq!(parsed.header_len(), 20);
        assert_eq!(packet.header_len(), 20);
    }

    #[test]
    fn seq_number_order() {
        assert!(SeqNumber(1) > SeqNumber(0));
        assert!(SeqNumber::from_u32(0) > SeqNumber::from_u32(u32::MAX));
        assert_eq!(SeqNumber::from_u32(u32::MAX) + 2, SeqNumber(1));
        assert_eq!(SeqNumber::from_u32(u32::MAX).as_u32(), u32::MAX);
        assert_eq!(SeqNumber::from_u32(u32::MAX).to_string(), "4294967295");
    }

    #[test]
    fn flags_display() {
        assert_eq!(Flags::SYN_ACK.to_string(), "SYN|ACK");
        assert_eq!(Flags(0).to_string(), "-");
    }
}
