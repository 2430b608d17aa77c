use core::fmt;

/// The error type for parsing frames off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// The frame was shorter than its headers claim.
    ///
    /// Either shorter than the minimum header or shorter than a length field within it.
    Truncated,

    /// A header checksum did not verify.
    WrongChecksum,

    /// The frame is not a protocol we understand, such as an IPv6 packet.
    ///
    /// The kernel sends these onto a freshly configured tun on its own. They are nothing to worry
    /// about and can be skipped.
    Unrecognized,

    /// The frame was recognized but was self-contradictory.
    ///
    /// Examples: a TCP header length smaller than 20 octets, an IPv4 header longer than the total
    /// length.
    Malformed,

    /// The frame relies on a feature we do not implement, i.e. IPv4 fragmentation.
    Unsupported,
}

/// The result type for the wire module.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated     => write!(f, "truncated packet"),
            Error::WrongChecksum => write!(f, "checksum error"),
            Error::Unrecognized  => write!(f, "unrecognized packet"),
            Error::Unsupported   => write!(f, "unsupported option"),
            Error::Malformed     => write!(f, "malformed packet"),
        }
    }
}

impl std::error::Error for Error {}
