#![allow(unsafe_code)]
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//
// Applies to files in this folder unless otherwise noted. These are:
// * `linux.rs`
// * `mod.rs`
// * `tun_interface.rs`
use core::fmt;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

mod linux;
mod tun_interface;

/// Module importing all types that should be exported.
///
/// Allows keeping all the `cfg` bits inside this module by enabling a controlled glob import from
/// the super module.
pub mod exports {
    pub use super::tun_interface::{Control, TunInterfaceDesc};
    pub use super::{pipe, wait, Descriptor, Errno, Readiness};
}

/// An errno value.
///
/// This is used as the error representation of raw libc calls. It can be converted into a
/// `std::io::Error`, where it will consequently have much more extensive error information.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Errno(pub libc::c_int);

/// A file descriptor that is closed when dropped.
#[derive(Debug)]
pub struct Descriptor(libc::c_int);

/// The outcome of waiting on the device and the hang-up pipe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    /// The device has a frame or an error pending.
    pub device: bool,
    /// The write end of the hang-up pipe was closed.
    pub hangup: bool,
}

#[derive(Clone, Copy)]
struct FdResult(pub libc::c_int);

#[derive(Clone, Copy)]
struct IoLenResult(pub libc::ssize_t);

type IoctlResult = FdResult;
#[allow(non_snake_case)] // Emulate type alias also importing constructor.
fn IoctlResult(val: libc::c_int) -> IoctlResult { FdResult(val) }

/// Base for an if ioctl request.
///
/// Contains the name of the interface.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
struct ifreq {
    ifr_name: [libc::c_char; libc::IF_NAMESIZE],
}

/// Trait for interpreting integer return values.
///
/// Failure signals may vary between:
/// * `-1`
/// * arbitrary negative values
/// * non-zero
trait LibcResult: Copy {
    fn is_fail(self) -> bool;

    fn errno(self) -> Result<(), Errno> {
        if self.is_fail() {
            Err(Errno::new())
        } else {
            Ok(())
        }
    }
}

impl Errno {
    /// The errno of the last failed call on this thread.
    pub fn new() -> Errno {
        Errno(unsafe { *libc::__errno_location() })
    }
}

impl LibcResult for FdResult {
    fn is_fail(self) -> bool {
        self.0 == -1
    }
}

impl LibcResult for IoLenResult {
    fn is_fail(self) -> bool {
        self.0 == -1
    }
}

impl From<Errno> for io::Error {
    fn from(err: Errno) -> io::Error {
        io::Error::from_raw_os_error(err.0 as i32)
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", io::Error::from_raw_os_error(self.0 as i32))
    }
}

impl ifreq {
    /// Prepare a request for the named interface.
    ///
    /// The name must leave room for the terminating nul, longer names are `EINVAL`.
    fn new(name: &str) -> Result<Self, Errno> {
        if name.len() >= libc::IF_NAMESIZE || name.as_bytes().contains(&0) {
            return Err(Errno(libc::EINVAL));
        }

        let mut ifr_name = [0; libc::IF_NAMESIZE];

        for (i, byte) in name.as_bytes().iter().enumerate() {
            ifr_name[i] = *byte as libc::c_char
        }

        Ok(ifreq {
            ifr_name,
        })
    }

    /// The name as currently filled in, up to the first nul.
    fn name(&self) -> String {
        let bytes: Vec<u8> = self.ifr_name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Descriptor {
    fn new(fd: libc::c_int) -> Self {
        Descriptor(fd)
    }
}

impl AsRawFd for Descriptor {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl Drop for Descriptor {
    fn drop(&mut self) {
        unsafe { libc::close(self.0); }
    }
}

/// Open a pipe, returning the read and write end.
///
/// Both ends are close-on-exec. Dropping the write end makes the read end report a hang-up.
pub fn pipe() -> Result<(Descriptor, Descriptor), Errno> {
    let mut fds: [libc::c_int; 2] = [-1; 2];
    let res = unsafe {
        libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC)
    };

    FdResult(res).errno()?;

    Ok((Descriptor::new(fds[0]), Descriptor::new(fds[1])))
}

/// Wait until the device becomes readable or the hang-up pipe is closed.
///
/// Blocks without a timeout. An interrupted wait is reported as `EINTR` and should be retried.
pub fn wait(device: RawFd, hangup: RawFd) -> Result<Readiness, Errno> {
    let mut fds = [
        libc::pollfd { fd: device, events: libc::POLLIN, revents: 0 },
        libc::pollfd { fd: hangup, events: libc::POLLIN, revents: 0 },
    ];

    let res = unsafe {
        libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1)
    };

    FdResult(res).errno()?;

    let ready = libc::POLLIN | libc::POLLERR | libc::POLLHUP;
    Ok(Readiness {
        device: fds[0].revents & ready != 0,
        hangup: fds[1].revents & ready != 0,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ifreq_name() {
        let req = ifreq::new("ffharness%d").unwrap();
        assert_eq!(req.name(), "ffharness%d");
        assert_eq!(ifreq::new("a-name-far-too-long").unwrap_err(), Errno(libc::EINVAL));
        assert_eq!(ifreq::new("nul\0").unwrap_err(), Errno(libc::EINVAL));
    }

    #[test]
    fn hangup_on_close() {
        let (read, write) = pipe().unwrap();
        let (other, _keep) = pipe().unwrap();
        drop(write);

        let ready = wait(other.as_raw_fd(), read.as_raw_fd()).unwrap();
        assert_eq!(ready, Readiness { device: false, hangup: true });
    }
}
