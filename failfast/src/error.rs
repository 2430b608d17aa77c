use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::wire;

/// The result type of conditioning connections and running the harness.
pub type Result<T> = core::result::Result<T, Error>;

/// Everything that can go wrong when conditioning a connection or running the harness.
#[derive(Debug, Error)]
pub enum Error {
    /// A plain i/o failure, such as failing to connect or a failing `setsockopt`.
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),

    /// The platform has no way to bound the retransmission time of a connection.
    #[error("bounding the tcp retransmission time is not supported on this platform")]
    Unsupported,

    /// The timeout is zero or can not be expressed in whole milliseconds of `u32`.
    #[error("invalid timeout {0:?}, must be between 1ms and 2^32-1ms")]
    InvalidTimeout(Duration),

    /// A frame on the virtual interface did not decode.
    ///
    /// The harness only sees traffic of the kernel stack talking to itself, so this is a bug in
    /// the frames it produced and not a condition to continue from.
    #[error("malformed frame on the virtual interface: {0}")]
    Decode(#[from] wire::Error),

    /// A named operation on the virtual device failed.
    #[error("{op} failed on the virtual device: {source}")]
    Device {
        /// The failing operation, such as `TUNSETIFF` or `poll`.
        op: &'static str,
        /// The error of the operating system.
        #[source]
        source: io::Error,
    },

    /// The receive buffer of the harness can not hold a frame of the configured mtu.
    #[error("receive buffer of {buffer_len} bytes is smaller than the mtu of {mtu}")]
    BufferTooSmall {
        /// The configured length of the receive buffer.
        buffer_len: usize,
        /// The configured mtu of the device.
        mtu: u32,
    },

    /// The background worker of the harness panicked.
    #[error("the harness worker thread panicked")]
    Worker,
}

impl Error {
    pub(crate) fn device(op: &'static str, source: impl Into<io::Error>) -> Self {
        Error::Device { op, source: source.into() }
    }

    /// Check if this error stems from lacking permissions or devices to create a tun.
    ///
    /// Useful for telling an unprivileged environment apart from a real failure.
    pub fn is_unprivileged(&self) -> bool {
        let source = match self {
            Error::Io(source) | Error::Device { source, .. } => source,
            _ => return false,
        };

        match source.kind() {
            io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound => true,
            _ => source.raw_os_error() == Some(libc::ENODEV),
        }
    }
}
