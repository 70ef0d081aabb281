//! Common error types for network operations

use std::io;

/// A common error type for network operations.
///
/// This enum defines the failures a connector or a connection can report.
/// It is deliberately small and `Copy` so transports can return it from any
/// layer without allocating.
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
pub enum Error {
    /// An operation was attempted on a connection that is not open.
    #[error("connection is not open")]
    NotOpen,
    /// An error occurred during a write operation.
    #[error("write failed")]
    WriteError,
    /// An error occurred during a read operation.
    #[error("read failed")]
    ReadError,
    /// A connection attempt was refused.
    #[error("connection refused")]
    ConnectionRefused,
    /// A timeout occurred.
    #[error("timed out")]
    Timeout,
    /// The connection was closed.
    #[error("connection closed")]
    ConnectionClosed,
    /// An invalid or unsupported address was provided.
    #[error("invalid or unsupported address")]
    InvalidAddress,
    /// The host name could not be resolved.
    #[error("could not resolve host")]
    NameResolution,
    /// A protocol-specific error occurred.
    #[error("protocol error")]
    ProtocolError,
}

impl Error {
    /// Whether this failure is about reaching the peer at all, as opposed to
    /// a malformed address or a broken exchange.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Error::NotOpen
                | Error::ConnectionRefused
                | Error::Timeout
                | Error::ConnectionClosed
                | Error::NameResolution
        )
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Error::ConnectionRefused,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Error::ConnectionClosed,
            io::ErrorKind::NotConnected => Error::NotOpen,
            io::ErrorKind::InvalidInput | io::ErrorKind::AddrNotAvailable => Error::InvalidAddress,
            io::ErrorKind::InvalidData => Error::ProtocolError,
            _ => Error::ReadError,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::NameResolution => defmt::write!(f, "NameResolution"),
            Error::ProtocolError => defmt::write!(f, "ProtocolError"),
        }
    }
}
