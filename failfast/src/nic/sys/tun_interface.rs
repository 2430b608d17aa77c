// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
use core::convert::TryFrom;
use std::net::Ipv4Addr;
use std::os::unix::io::{AsRawFd, RawFd};

use super::{Descriptor, Errno, FdResult, IoLenResult, LibcResult, ifreq};

mod tun_traits {
    pub(crate) use super::super::linux::{NetdeviceConfig, TunSetIf};

    // for other OS's, other traits might be used instead.
}

use tun_traits::{NetdeviceConfig, TunSetIf};

/// A static descriptor for interacting with a tun interface.
///
/// Contains the file descriptor and a pre-filled `ifreq` structure with the interface name that is
/// required for `ioctl` calls. The descriptor is blocking, wait for it to become readable before
/// calling [`recv`] when that should be interruptible.
///
/// [`recv`]: #method.recv
#[derive(Debug)]
pub struct TunInterfaceDesc {
    lower: libc::c_int,
    ifreq: ifreq,
}

/// An `AF_INET` datagram socket to configure interfaces with.
///
/// Closed when dropped.
#[derive(Debug)]
pub struct Control {
    socket: Descriptor,
}

static TUN_PATH: &[u8] = b"/dev/net/tun\0";

impl AsRawFd for TunInterfaceDesc {
    fn as_raw_fd(&self) -> RawFd {
        self.lower
    }
}

impl TunInterfaceDesc {
    /// Try to open a descriptor for the named interface.
    ///
    /// Note that this does *not* yet set the interface for the file descriptor, it only creates
    /// the necessary structures involved in doing so. Call [`attach_interface`] afterwards.
    ///
    /// [`attach_interface`]: #method.attach_interface
    pub fn new(name: &str) -> Result<TunInterfaceDesc, Errno> {
        let ifreq = ifreq::new(name)?;

        let lower = unsafe {
            libc::open(
                TUN_PATH.as_ptr() as *const libc::c_char,
                libc::O_RDWR | libc::O_CLOEXEC)
        };

        FdResult(lower).errno()?;

        Ok(TunInterfaceDesc {
            lower,
            ifreq,
        })
    }

    /// Create the interface, or attach to an existing one, and bind the descriptor to it.
    ///
    /// See `ioctl` with `TUNSETIFF` for details on errors.
    pub fn attach_interface(&mut self) -> Result<(), Errno> {
        self.ifreq.tun_set_tun(self.lower)
    }

    /// The name of the interface.
    ///
    /// After a successful [`attach_interface`] this is the name chosen by the kernel.
    ///
    /// [`attach_interface`]: #method.attach_interface
    pub fn name(&self) -> String {
        self.ifreq.name()
    }

    /// Receive a single frame on the tun into the buffer.
    pub fn recv(&mut self, buffer: &mut [u8]) -> Result<usize, Errno> {
        let len = unsafe {
            libc::read(
                self.lower,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len())
        };
        IoLenResult(len).errno()?;
        Ok(len as usize)
    }

    /// Send a single frame onto the tun from the buffer.
    pub fn send(&mut self, buffer: &[u8]) -> Result<usize, Errno> {
        let len = unsafe {
            libc::write(
                self.lower,
                buffer.as_ptr() as *const libc::c_void,
                buffer.len())
        };
        IoLenResult(len).errno()?;
        Ok(len as usize)
    }
}

impl Drop for TunInterfaceDesc {
    fn drop(&mut self) {
        unsafe { libc::close(self.lower); }
    }
}

impl Control {
    /// Open the control socket.
    pub fn new() -> Result<Self, Errno> {
        let socket = unsafe {
            libc::socket(libc::AF_INET, libc::SOCK_DGRAM | libc::SOCK_CLOEXEC, libc::IPPROTO_IP)
        };

        FdResult(socket).errno()?;

        Ok(Control { socket: Descriptor::new(socket) })
    }

    /// Assign the local address of the interface.
    pub fn set_address(&self, tun: &TunInterfaceDesc, addr: Ipv4Addr) -> Result<(), Errno> {
        tun.ifreq.set_if_addr(self.socket.as_raw_fd(), addr)
    }

    /// Assign the netmask of the interface, which determines its subnet route.
    pub fn set_netmask(&self, tun: &TunInterfaceDesc, netmask: Ipv4Addr) -> Result<(), Errno> {
        tun.ifreq.set_if_netmask(self.socket.as_raw_fd(), netmask)
    }

    /// Change the mtu of the interface.
    pub fn set_mtu(&self, tun: &TunInterfaceDesc, mtu: u32) -> Result<(), Errno> {
        let mtu = libc::c_int::try_from(mtu).map_err(|_| Errno(libc::EINVAL))?;
        tun.ifreq.set_if_mtu(self.socket.as_raw_fd(), mtu)
    }

    /// Set the interface up and running, keeping all other flags.
    ///
    /// Setting flags that are already set has no effect.
    pub fn set_up(&self, tun: &TunInterfaceDesc) -> Result<(), Errno> {
        let fd = self.socket.as_raw_fd();
        let flags = tun.ifreq.get_if_flags(fd)?;
        tun.ifreq.set_if_flags(fd, flags | ifreq::IFF_UP | ifreq::IFF_RUNNING)
    }
}
