//! The peer end of the connection under test.
//!
//! Answers on the packet level just enough for the kernel stack to consider the connection
//! established and its data delivered. There is no connection state besides a single outbound
//! sequence counter, one reply is emitted for each handshake or data segment and nothing else is
//! ever sent. In particular the responder never resets or finishes a connection.
use std::io;

use crate::wire::{self, tcp, ParsedPacket, Segment};
use crate::wire::tcp::{Flags, SeqNumber};

/// Where the responder puts its replies.
pub trait Transmit {
    /// Send one complete IPv4 packet.
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// Collects replies in memory.
impl Transmit for Vec<Vec<u8>> {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        self.push(frame.to_vec());
        Ok(())
    }
}

impl<T: Transmit + ?Sized> Transmit for &'_ mut T {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).transmit(frame)
    }
}

/// Decides on and emits the reply to every inbound frame.
#[derive(Debug)]
pub struct Responder<W> {
    sink: W,
    seq: SeqNumber,
    replies: u64,
    ignored: u64,
}

impl<W: Transmit> Responder<W> {
    /// A responder starting from sequence number zero.
    pub fn new(sink: W) -> Self {
        Responder {
            sink,
            seq: SeqNumber(0),
            replies: 0,
            ignored: 0,
        }
    }

    /// Handle one inbound frame.
    ///
    /// Returns whether a reply was transmitted. Nothing is sent while `silenced` is set. An error
    /// of the sink is returned unchanged.
    pub fn receive(&mut self, packet: &ParsedPacket, silenced: bool) -> io::Result<bool> {
        let segment = match &packet.tcp {
            Some(segment) => segment,
            None => return Ok(false),
        };

        if silenced {
            self.ignored += 1;
            net_debug!("silenced, dropping {}", segment.repr);
            return Ok(false);
        }

        let (flags, ack_number) = match Self::reply_kind(segment) {
            Some(kind) => kind,
            None => return Ok(false),
        };

        self.seq += 1;
        let tcp = tcp::Repr {
            src_port: segment.repr.dst_port,
            dst_port: segment.repr.src_port,
            flags,
            seq_number: self.seq,
            ack_number: Some(ack_number),
            window_len: segment.repr.window_len,
            payload_len: 0,
        };
        let ip = packet.ip.reply(tcp.buffer_len());

        net_trace!("reply {} {}", ip, tcp);
        let frame = wire::encode(&ip, &tcp, &[]);
        self.sink.transmit(&frame)?;
        self.replies += 1;
        Ok(true)
    }

    /// The flags and acknowledgment of the reply, if the segment deserves one.
    fn reply_kind(segment: &Segment) -> Option<(Flags, SeqNumber)> {
        let repr = &segment.repr;
        if repr.flags.syn() {
            Some((Flags::SYN_ACK, repr.seq_number + 1))
        } else if !segment.payload.is_empty() {
            Some((Flags::ACK, repr.seq_number + segment.payload.len()))
        } else {
            None
        }
    }

    /// The sequence number of the last reply, zero before the first one.
    pub fn seq(&self) -> SeqNumber {
        self.seq
    }

    /// Number of frames answered.
    pub fn replies(&self) -> u64 {
        self.replies
    }

    /// Number of segments dropped because of silence.
    pub fn ignored(&self) -> u64 {
        self.ignored
    }

    /// A reference to the sink.
    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// A mutable reference to the sink.
    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }
}

impl Default for Responder<Vec<Vec<u8>>> {
    fn default() -> Self {
        Responder::new(Vec::new())
    }
}
