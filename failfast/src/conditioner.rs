//! Bound the time a connection may go without acknowledgement.
//!
//! On Linux this is the `TCP_USER_TIMEOUT` socket option of [RFC 5482]. Once set, the kernel
//! aborts the connection when transmitted data stays unacknowledged for longer than the timeout,
//! instead of retransmitting for the duration configured by `tcp_retries2`. The application then
//! observes an error (`ETIMEDOUT`) on its next read followed by end-of-stream.
//!
//! Other platforms have no equivalent. There, [`arm`] fails with [`Error::Unsupported`] at runtime
//! so that callers on every platform handle it the same way, and [`is_supported`] allows checking
//! ahead of time.
//!
//! [RFC 5482]: https://tools.ietf.org/html/rfc5482
//! [`arm`]: fn.arm.html
//! [`is_supported`]: fn.is_supported.html
//! [`Error::Unsupported`]: ../enum.Error.html#variant.Unsupported
use std::net::TcpStream;
use std::time::Duration;

use crate::{Error, Result};

/// Check if connections can be conditioned on this platform.
pub fn is_supported() -> bool {
    cfg!(target_os = "linux")
}

/// Bound the unacknowledged retransmission time of a live connection to `timeout`.
///
/// The kernel option has millisecond granularity. A `timeout` that is zero when truncated to
/// milliseconds, or that exceeds `u32::MAX` milliseconds, is rejected with
/// `Error::InvalidTimeout` before touching the socket.
pub fn arm(stream: &TcpStream, timeout: Duration) -> Result<()> {
    let millis = timeout_millis(timeout)?;
    imp::set_user_timeout(stream, millis)?;
    net_debug!("armed user timeout of {}ms", millis);
    Ok(())
}

/// Read back the bound previously set with [`arm`], if any.
///
/// [`arm`]: fn.arm.html
pub fn armed_timeout(stream: &TcpStream) -> Result<Option<Duration>> {
    let millis = imp::user_timeout(stream)?;
    Ok(match millis {
        0 => None,
        millis => Some(Duration::from_millis(millis.into())),
    })
}

fn timeout_millis(timeout: Duration) -> Result<u32> {
    match timeout.as_millis() {
        0 => Err(Error::InvalidTimeout(timeout)),
        millis if millis > u128::from(u32::MAX) => Err(Error::InvalidTimeout(timeout)),
        millis => Ok(millis as u32),
    }
}

#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
mod imp {
    use core::mem;
    use std::io;
    use std::net::TcpStream;
    use std::os::unix::io::AsRawFd;

    use crate::Result;

    pub(super) fn set_user_timeout(stream: &TcpStream, millis: u32) -> Result<()> {
        let value: libc::c_uint = millis;
        let res = unsafe {
            libc::setsockopt(
                stream.as_raw_fd(),
                libc::IPPROTO_TCP,
                libc::TCP_USER_TIMEOUT,
                &value as *const libc::c_uint as *const libc::c_void,
                mem::size_of::<libc::c_uint>() as libc::socklen_t)
        };

        if res == -1 {
            return Err(io::Error::last_os_error().into());
        }

        Ok(())
    }

    pub(super) fn user_timeout(stream: &TcpStream) -> Result<u32> {
        let mut value: libc::c_uint = 0;
        let mut len = mem::size_of::<libc::c_uint>() as libc::socklen_t;
        let res = unsafe {
            libc::getsockopt(
                stream.as_raw_fd(),
                libc::IPPROTO_TCP,
                libc::TCP_USER_TIMEOUT,
                &mut value as *mut libc::c_uint as *mut libc::c_void,
                &mut len)
        };

        if res == -1 {
            return Err(io::Error::last_os_error().into());
        }

        Ok(value)
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use std::net::TcpStream;

    use crate::{Error, Result};

    pub(super) fn set_user_timeout(_: &TcpStream, _: u32) -> Result<()> {
        Err(Error::Unsupported)
    }

    pub(super) fn user_timeout(_: &TcpStream) -> Result<u32> {
        Err(Error::Unsupported)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timeout_bounds() {
        assert!(matches!(timeout_millis(Duration::from_secs(0)), Err(Error::InvalidTimeout(_))));
        assert!(matches!(timeout_millis(Duration::from_micros(999)), Err(Error::InvalidTimeout(_))));
        assert!(matches!(
            timeout_millis(Duration::from_millis(u64::from(u32::MAX) + 1)),
            Err(Error::InvalidTimeout(_))));
        assert_eq!(timeout_millis(Duration::from_micros(1500)).unwrap(), 1);
        assert_eq!(timeout_millis(Duration::from_secs(5)).unwrap(), 5000);
    }
}
