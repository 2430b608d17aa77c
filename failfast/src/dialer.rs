use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::{conditioner, Result};

/// The retransmission bound when a dialer is not given one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Dials TCP connections that fail fast when their peer goes silent.
///
/// Each connection is armed with [`conditioner::arm`] right after it was established. A
/// connection that can not be armed is closed again and never returned.
///
/// [`conditioner::arm`]: conditioner/fn.arm.html
#[derive(Clone, Debug, Default)]
pub struct FailFastDialer {
    /// Time after which retransmissions stop and the connection is closed.
    ///
    /// `None` means [`DEFAULT_TIMEOUT`].
    ///
    /// [`DEFAULT_TIMEOUT`]: constant.DEFAULT_TIMEOUT.html
    pub timeout: Option<Duration>,
    /// Bound on establishing the connection, per resolved address.
    pub connect_timeout: Option<Duration>,
    /// Disable Nagle's algorithm on the dialed stream.
    pub nodelay: bool,
}

impl FailFastDialer {
    /// A dialer with the chosen retransmission bound.
    pub fn new(timeout: Duration) -> Self {
        FailFastDialer {
            timeout: Some(timeout),
            ..FailFastDialer::default()
        }
    }

    /// Bound the time spent on establishing each connection.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Choose whether dialed streams disable Nagle's algorithm.
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// The retransmission bound applied to each connection.
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Connect to `addr` and arm the connection.
    ///
    /// Resolved addresses are tried in order, like `TcpStream::connect`, and the error of the
    /// last attempt is reported when none succeeds.
    pub fn dial(&self, addr: impl ToSocketAddrs) -> Result<TcpStream> {
        let stream = self.connect(addr)?;
        self.condition(&stream)?;
        Ok(stream)
    }

    /// Arm an already established connection with the timeout of this dialer.
    pub fn condition(&self, stream: &TcpStream) -> Result<()> {
        if self.nodelay {
            stream.set_nodelay(true)?;
        }
        conditioner::arm(stream, self.timeout())
    }

    fn connect(&self, addr: impl ToSocketAddrs) -> io::Result<TcpStream> {
        let connect_timeout = match self.connect_timeout {
            None => return TcpStream::connect(addr),
            Some(timeout) => timeout,
        };

        let mut last_err = None;
        for addr in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "could not resolve to any addresses")
        }))
    }
}
