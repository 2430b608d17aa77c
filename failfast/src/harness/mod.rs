//! A peer that can be made to vanish without a trace.
//!
//! The [`Interface`] creates a tun device and claims its whole subnet, except for the local
//! address of the host end. Connections the host dials to any other address of the subnet are
//! answered by a [`Responder`] running on a background thread: it completes the handshake and
//! acknowledges data. Once the [`Silence`] is set the frames are still read off the device but no
//! longer answered. To the kernel the peer has gone dark, exactly like a host that lost power.
//!
//! ```no_run
//! use std::io::Write;
//! use std::time::Duration;
//! use failfast::{conditioner, harness};
//!
//! let config = harness::Config::new("10.1.0.10".parse().unwrap(), 24);
//! let interface = harness::Interface::open(config.clone())?;
//!
//! let mut stream = std::net::TcpStream::connect((config.peer(20), 1000))?;
//! stream.write_all(b"hello\n")?;
//! conditioner::arm(&stream, Duration::from_secs(5))?;
//!
//! interface.silence().set(true);
//! // Any further write goes unacknowledged and the kernel aborts the connection.
//! # interface.close()?;
//! # Ok::<(), failfast::Error>(())
//! ```
//!
//! [`Interface`]: struct.Interface.html
//! [`Responder`]: responder/struct.Responder.html
//! [`Silence`]: struct.Silence.html
use core::convert::TryFrom;
use std::io;
use std::net::Ipv4Addr;
use std::os::unix::io::AsRawFd;
use std::thread;

use crate::{wire, Error, Result};
use crate::nic::sys::{self, Control, Descriptor, Errno, TunInterfaceDesc};
use crate::wire::{Checksum, Frame};

pub mod responder;
mod silence;

pub use self::responder::{Responder, Transmit};
pub use self::silence::Silence;

/// The name of the background thread of an interface.
pub const THREAD_NAME: &str = "failfast-tun";

/// Configuration of the harness interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Name of the tun device, a `%d` is replaced by the kernel with the first free index.
    pub name: String,
    /// The local address of the host end.
    pub address: Ipv4Addr,
    /// Netmask of the subnet the harness answers for.
    pub netmask: Ipv4Addr,
    /// An mtu to set, the kernel default when `None`.
    pub mtu: Option<u32>,
    /// Size of the buffer read frames are stored in.
    pub buffer_len: usize,
    /// Whether inbound checksums are verified.
    pub checksum: Checksum,
}

/// A running harness on a tun device.
///
/// Dropping it stops the background thread as well, but only [`close`] reports its outcome.
///
/// [`close`]: #method.close
#[derive(Debug)]
pub struct Interface {
    name: String,
    silence: Silence,
    hangup: Option<Descriptor>,
    worker: Option<thread::JoinHandle<Result<()>>>,
}

/// State owned by the background thread.
struct ReadLoop {
    responder: Responder<TunInterfaceDesc>,
    hangup: Descriptor,
    silence: Silence,
    buffer: Vec<u8>,
    checksum: Checksum,
}

impl Config {
    /// Address the host end, with a subnet of the given prefix length.
    ///
    /// Prefix lengths beyond 32 are treated as 32.
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Self {
        let host_bits = 32 - u32::from(prefix_len.min(32));
        let netmask = u32::MAX.checked_shl(host_bits).unwrap_or(0);
        Config {
            address,
            netmask: Ipv4Addr::from(netmask),
            ..Config::default()
        }
    }

    /// Change the name of the device.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set an mtu on bring-up.
    pub fn with_mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Change the size of the receive buffer.
    ///
    /// With an explicit mtu the buffer must be at least as large, see [`validate`]. Longer frames
    /// would be read truncated and fail to decode.
    ///
    /// [`validate`]: #method.validate
    pub fn with_buffer_len(mut self, buffer_len: usize) -> Self {
        self.buffer_len = buffer_len;
        self
    }

    /// Check that the configuration is usable before any device is created.
    pub fn validate(&self) -> Result<()> {
        match self.mtu {
            Some(mtu) if self.buffer_len < mtu as usize => Err(Error::BufferTooSmall {
                buffer_len: self.buffer_len,
                mtu,
            }),
            _ => Ok(()),
        }
    }

    /// Choose how inbound checksums are handled.
    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = checksum;
        self
    }

    /// The number of leading ones of the netmask.
    pub fn prefix_len(&self) -> u32 {
        u32::from(self.netmask).leading_ones()
    }

    /// The address of `host` inside the subnet.
    ///
    /// Bits of `host` outside the host part are discarded.
    pub fn peer(&self, host: u32) -> Ipv4Addr {
        let mask = u32::from(self.netmask);
        let network = u32::from(self.address) & mask;
        Ipv4Addr::from(network | (host & !mask))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: "ffharness%d".into(),
            address: Ipv4Addr::new(10, 1, 0, 10),
            netmask: Ipv4Addr::new(255, 255, 255, 0),
            mtu: None,
            buffer_len: 4096,
            checksum: Checksum::Manual,
        }
    }
}

impl Transmit for TunInterfaceDesc {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        let len = self.send(frame)?;
        if len != frame.len() {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "short write to tun"));
        }
        Ok(())
    }
}

/// Assign the address and netmask of the config to the device and set it up.
///
/// Running it again on the same device has no further effect.
pub fn bring_up(tun: &TunInterfaceDesc, config: &Config) -> Result<()> {
    let control = Control::new()
        .map_err(|err| Error::device("socket", err))?;
    control.set_address(tun, config.address)
        .map_err(|err| Error::device("SIOCSIFADDR", err))?;
    control.set_netmask(tun, config.netmask)
        .map_err(|err| Error::device("SIOCSIFNETMASK", err))?;
    if let Some(mtu) = config.mtu {
        control.set_mtu(tun, mtu)
            .map_err(|err| Error::device("SIOCSIFMTU", err))?;
    }
    control.set_up(tun)
        .map_err(|err| Error::device("SIOCSIFFLAGS", err))?;

    net_debug!("brought up {} as {}/{}", tun.name(), config.address, config.prefix_len());
    Ok(())
}

impl Interface {
    /// Create the device, bring it up and start answering on it.
    ///
    /// Needs `CAP_NET_ADMIN`, see [`Error::is_unprivileged`] for telling a missing permission
    /// apart from other failures.
    ///
    /// [`Error::is_unprivileged`]: ../enum.Error.html#method.is_unprivileged
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let mut tun = TunInterfaceDesc::new(&config.name)
            .map_err(|err| Error::device("open", err))?;
        tun.attach_interface()
            .map_err(|err| Error::device("TUNSETIFF", err))?;
        bring_up(&tun, &config)?;

        let name = tun.name();
        let (hangup, hangup_tx) = sys::pipe()
            .map_err(|err| Error::device("pipe", err))?;
        let silence = Silence::new();

        let read_loop = ReadLoop {
            responder: Responder::new(tun),
            hangup,
            silence: silence.clone(),
            buffer: vec![0; config.buffer_len],
            checksum: config.checksum,
        };

        let worker = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || read_loop.run())?;

        Ok(Interface {
            name,
            silence,
            hangup: Some(hangup_tx),
            worker: Some(worker),
        })
    }

    /// The name the kernel gave to the device.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A handle to the silence switch of this interface.
    pub fn silence(&self) -> Silence {
        self.silence.clone()
    }

    /// Check if the background thread still reads frames.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(false, |worker| !worker.is_finished())
    }

    /// Stop the background thread, remove the device and report how the thread ended.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        // Closing the write end wakes the thread up.
        drop(self.hangup.take());

        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| Error::Worker)?,
            None => Ok(()),
        }
    }
}

impl Drop for Interface {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            net_warn!("harness on {} ended with: {}", self.name, err);
        }
    }
}

impl ReadLoop {
    fn run(mut self) -> Result<()> {
        let name = self.responder.sink().name();
        net_debug!("read loop on {} started", name);

        let result = self.serve();

        net_debug!("read loop on {} stopped, replied {} and ignored {} frames",
            name, self.responder.replies(), self.responder.ignored());
        if let Err(err) = &result {
            net_error!("read loop on {} failed: {}", name, err);
        }

        result
    }

    fn serve(&mut self) -> Result<()> {
        let device = self.responder.sink().as_raw_fd();
        let hangup = self.hangup.as_raw_fd();

        loop {
            let ready = match sys::wait(device, hangup) {
                Ok(ready) => ready,
                Err(Errno(libc::EINTR)) => continue,
                Err(err) => return Err(Error::device("poll", err)),
            };

            if ready.hangup {
                return Ok(());
            }

            if !ready.device {
                continue;
            }

            let len = match self.responder.sink_mut().recv(&mut self.buffer) {
                Ok(0) => return Ok(()),
                Ok(len) => len,
                Err(Errno(libc::EINTR)) => continue,
                Err(err) => return Err(Error::device("read", err)),
            };

            let frame = Frame::new(&self.buffer[..len]);
            let packet = match frame.decode(self.checksum) {
                Ok(packet) => packet,
                Err(wire::Error::Unrecognized) => {
                    net_trace!("skipping frame of ip version {:?}", frame.version());
                    continue;
                },
                Err(err) => return Err(Error::Decode(err)),
            };

            net_trace!("recv {}", packet);
            self.responder.receive(&packet, self.silence.get())
                .map_err(|err| Error::device("write", err))?;
        }
    }
}

impl TryFrom<&'_ str> for Config {
    type Error = Error;

    /// Parse an address with prefix length such as `10.1.0.10/24`.
    fn try_from(cidr: &str) -> Result<Self> {
        let invalid = || Error::from(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not an ipv4 address with prefix length: {}", cidr)));

        let mut parts = cidr.splitn(2, '/');
        let address = parts.next()
            .and_then(|addr| addr.parse().ok())
            .ok_or_else(invalid)?;
        let prefix_len = match parts.next() {
            None => 32,
            Some(len) => len.parse::<u8>().ok().filter(|&len| len <= 32).ok_or_else(invalid)?,
        };

        Ok(Config::new(address, prefix_len))
    }
}
