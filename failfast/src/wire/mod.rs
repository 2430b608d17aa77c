/*! Low-level packet access and construction.

The `wire` module deals with the packet *representation* of the frames crossing the tun device.
Only IPv4 and TCP are understood, since these are all the harness ever speaks. It provides three
levels of functionality.

 * First, the `Packet` wrappers extract fields from sequences of octets and insert fields into
   them, e.g. [`ipv4::Packet`] or [`tcp::Packet`].
 * Second, a compact, high-level `Repr` of the header data that can be created from parsing and
   emitted into a sequence of octets, e.g. [`ipv4::Repr`] or [`tcp::Repr`].
 * Third, the [`Frame`] of a whole packet which decodes both layers at once and its inverse
   [`encode`] which serializes a reply and fills in all lengths and checksums.

[`ipv4::Packet`]: ipv4/struct.Packet.html
[`tcp::Packet`]: tcp/struct.Packet.html
[`ipv4::Repr`]: ipv4/struct.Repr.html
[`tcp::Repr`]: tcp/struct.Repr.html
[`Frame`]: struct.Frame.html
[`encode`]: fn.encode.html

The `Packet` family guarantees that, if `check_len()` returned `Ok(())`, then no field accessor
or setter method will panic. The `Repr::parse()` methods never panic. When emitting, the buffer
must be exactly as long as the header and payload that are written into it.

# Examples

To emit a reply into an octet buffer, and then parse it back:

```rust
use std::net::Ipv4Addr;
use failfast::wire::{self, ipv4, tcp, Checksum, Frame};

let ip = ipv4::Repr {
    src_addr:    Ipv4Addr::new(10, 1, 0, 20),
    dst_addr:    Ipv4Addr::new(10, 1, 0, 10),
    protocol:    ipv4::Protocol::Tcp,
    payload_len: 0,
    hop_limit:   64,
};
let tcp = tcp::Repr {
    src_port:    1000,
    dst_port:    40000,
    flags:       tcp::Flags::ACK,
    seq_number:  tcp::SeqNumber(2),
    ack_number:  Some(tcp::SeqNumber(8)),
    window_len:  64240,
    payload_len: 0,
};

let bytes = wire::encode(&ip, &tcp, &[]);
let parsed = Frame::new(&bytes).decode(Checksum::Manual)
    .expect("malformed packet");
assert_eq!(parsed.tcp.unwrap().repr, tcp);
```
*/
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//
// Applies to files in this folder unless otherwise noted. These are:
// * `ip.rs`
// * `ipv4.rs`
// * `mod.rs` (this file)
// * `tcp.rs`

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
}

mod error;
mod frame;
pub(crate) mod ip;
pub mod ipv4;
pub mod tcp;

/// Describes how to handle checksums.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// Checksum must be computed or checked manually.
    Manual,

    /// The checksum field is filled with zero and not checked.
    Ignored,
}

impl Checksum {
    pub(crate) fn manual(self) -> bool {
        self == Checksum::Manual
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Checksum::Manual
    }
}

pub use self::error::{Error, Result};
pub use self::frame::{encode, Frame, ParsedPacket, Segment};
pub use self::ip::Protocol as IpProtocol;
