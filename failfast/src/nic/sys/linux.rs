// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
use std::net::Ipv4Addr;

use super::{ifreq, Errno, LibcResult, IoctlResult};

/// Adds a method to open a tun.
///
/// This is an extension trait implemented for `ifreq` in Linux.
pub(crate) trait TunSetIf {
    /// Attach to an existing interface or create a new one.
    ///
    /// On success the request holds the interface name chosen by the kernel.
    fn tun_set_if(&mut self, fd: libc::c_int, kind: libc::c_short) -> Result<(), Errno>;

    /// Convenience method over `set_if` when `kind` is a tun without packet information.
    fn tun_set_tun(&mut self, fd: libc::c_int) -> Result<(), Errno>;
}

/// Adds methods to configure an interface through a control socket.
pub(crate) trait NetdeviceConfig {
    fn set_if_addr(&self, fd: libc::c_int, addr: Ipv4Addr) -> Result<(), Errno>;
    fn set_if_netmask(&self, fd: libc::c_int, netmask: Ipv4Addr) -> Result<(), Errno>;
    fn get_if_flags(&self, fd: libc::c_int) -> Result<libc::c_short, Errno>;
    fn set_if_flags(&self, fd: libc::c_int, flags: libc::c_short) -> Result<(), Errno>;
    fn set_if_mtu(&self, fd: libc::c_int, mtu: libc::c_int) -> Result<(), Errno>;
}

impl ifreq {
    pub(crate) const SIOCGIFFLAGS:   libc::Ioctl = 0x8913;
    pub(crate) const SIOCSIFFLAGS:   libc::Ioctl = 0x8914;
    pub(crate) const SIOCSIFADDR:    libc::Ioctl = 0x8916;
    pub(crate) const SIOCSIFNETMASK: libc::Ioctl = 0x891c;
    pub(crate) const SIOCSIFMTU:     libc::Ioctl = 0x8922;

    pub(crate) const TUNSETIFF:      libc::Ioctl = 0x400454CA;
    pub(crate) const IFF_TUN:        libc::c_short = 0x0001;
    pub(crate) const IFF_NO_PI:      libc::c_short = 0x1000;

    pub(crate) const IFF_UP:         libc::c_short = 0x0001;
    pub(crate) const IFF_RUNNING:    libc::c_short = 0x0040;
}

/// The union part of `struct ifreq` is 24 bytes, requests must not be shorter.
const IFREQ_UNION: usize = 24;

/// A request carrying a `c_short`, such as flags.
#[repr(C)]
#[derive(Debug)]
struct ShortRequest {
    interface: ifreq,
    value: libc::c_short,
    _pad: [u8; IFREQ_UNION - 2],
}

/// A request carrying a `c_int`, such as the mtu.
#[repr(C)]
struct IntRequest {
    interface: ifreq,
    value: libc::c_int,
    _pad: [u8; IFREQ_UNION - 4],
}

/// A request carrying an IPv4 socket address.
#[repr(C)]
struct AddrRequest {
    interface: ifreq,
    addr: libc::sockaddr_in,
    _pad: [u8; IFREQ_UNION - 16],
}

impl ShortRequest {
    fn new(interface: ifreq, value: libc::c_short) -> Self {
        ShortRequest { interface, value, _pad: [0; IFREQ_UNION - 2] }
    }
}

impl AddrRequest {
    fn new(interface: ifreq, addr: Ipv4Addr) -> Self {
        let addr = libc::sockaddr_in {
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: 0,
            sin_addr: libc::in_addr { s_addr: u32::from_ne_bytes(addr.octets()) },
            sin_zero: [0; 8],
        };

        AddrRequest { interface, addr, _pad: [0; IFREQ_UNION - 16] }
    }

    fn ioctl(&mut self, fd: libc::c_int, request: libc::Ioctl) -> Result<(), Errno> {
        let res = unsafe {
            libc::ioctl(fd, request, self as *mut _)
        };

        IoctlResult(res).errno()
    }
}

impl TunSetIf for ifreq {
    fn tun_set_if(&mut self, fd: libc::c_int, kind: libc::c_short) -> Result<(), Errno> {
        let mut request = ShortRequest::new(*self, kind);

        let res = unsafe {
            libc::ioctl(fd, Self::TUNSETIFF, &mut request as *mut _)
        };

        IoctlResult(res).errno()?;

        // The kernel writes back the name it picked for a `%d` pattern.
        *self = request.interface;
        Ok(())
    }

    fn tun_set_tun(&mut self, fd: libc::c_int) -> Result<(), Errno> {
        self.tun_set_if(fd, Self::IFF_TUN | Self::IFF_NO_PI)
    }
}

impl NetdeviceConfig for ifreq {
    fn set_if_addr(&self, fd: libc::c_int, addr: Ipv4Addr) -> Result<(), Errno> {
        AddrRequest::new(*self, addr).ioctl(fd, Self::SIOCSIFADDR)
    }

    fn set_if_netmask(&self, fd: libc::c_int, netmask: Ipv4Addr) -> Result<(), Errno> {
        AddrRequest::new(*self, netmask).ioctl(fd, Self::SIOCSIFNETMASK)
    }

    fn get_if_flags(&self, fd: libc::c_int) -> Result<libc::c_short, Errno> {
        let mut request = ShortRequest::new(*self, 0);

        let res = unsafe {
            libc::ioctl(fd, Self::SIOCGIFFLAGS, &mut request as *mut _)
        };

        IoctlResult(res).errno()?;

        Ok(request.value)
    }

    fn set_if_flags(&self, fd: libc::c_int, flags: libc::c_short) -> Result<(), Errno> {
        let mut request = ShortRequest::new(*self, flags);

        let res = unsafe {
            libc::ioctl(fd, Self::SIOCSIFFLAGS, &mut request as *mut _)
        };

        IoctlResult(res).errno()
    }

    fn set_if_mtu(&self, fd: libc::c_int, mtu: libc::c_int) -> Result<(), Errno> {
        let mut request = IntRequest {
            interface: *self,
            value: mtu,
            _pad: [0; IFREQ_UNION - 4],
        };

        let res = unsafe {
            libc::ioctl(fd, Self::SIOCSIFMTU, &mut request as *mut _)
        };

        IoctlResult(res).errno()
    }
}

#[cfg(test)]
mod test {
    use core::mem;
    use super::*;

    #[test]
    fn request_layout() {
        // Equal to `sizeof(struct ifreq)`, which the kernel copies in full.
        assert_eq!(mem::size_of::<ShortRequest>(), 40);
        assert_eq!(mem::size_of::<IntRequest>(), 40);
        assert_eq!(mem::size_of::<AddrRequest>(), 40);
    }
}
