//! Bound how long the kernel retransmits on a silent TCP connection, and prove that it does.
//!
//! ## Table of contents
//!
//! 1. [Conditioning a connection](#conditioning-a-connection)
//! 2. [The black-hole harness](#the-black-hole-harness)
//! 3. [The wire module](wire/index.html)
//! 4. [The tun device](nic/index.html)
//!
//! ## Conditioning a connection
//!
//! A TCP connection whose peer silently vanishes (power loss, a partition, a dropped NAT entry)
//! is not noticed by the sender until its retransmissions give up. On Linux that takes about 15
//! minutes with the default `tcp_retries2`. The [`conditioner`] arms `TCP_USER_TIMEOUT` on a
//! live socket so that the kernel closes the connection once data went unacknowledged for the
//! given duration, and [`FailFastDialer`] does so for every connection it dials.
//!
//! ```no_run
//! use std::time::Duration;
//! use failfast::FailFastDialer;
//!
//! let dialer = FailFastDialer::new(Duration::from_secs(5));
//! let stream = dialer.dial("10.1.0.20:1000")?;
//! # let _ = stream;
//! # Ok::<(), failfast::Error>(())
//! ```
//!
//! ## The black-hole harness
//!
//! Testing this needs a peer that behaves exactly like a host that went dark: no `ACK`, no `RST`,
//! no `FIN`. The [`harness`] provides one without firewall rules or loss injection. It opens a tun
//! device, answers the handshake and acknowledges data on the raw packet level. On request it
//! stops answering anything while it keeps draining the interface.
//!
//! [`conditioner`]: conditioner/index.html
//! [`harness`]: harness/index.html
//! [`FailFastDialer`]: struct.FailFastDialer.html
#![warn(missing_docs)]
#![warn(unreachable_pub)]

#[macro_use] mod macros;
pub mod conditioner;
mod dialer;
mod error;
#[cfg(target_os = "linux")]
pub mod harness;
#[cfg(target_os = "linux")]
pub mod nic;
pub mod wire;

pub use self::dialer::{FailFastDialer, DEFAULT_TIMEOUT};
pub use self::error::{Error, Result};
