//! A byte-stream network abstraction
//!
//! This module provides the small set of traits the HTTP layer is written
//! against. A connector opens a [`Connection`] to a remote `host:port`, and the
//! connection is a plain [`Read`] + [`Write`] + [`Close`] byte stream. Anything
//! that can move bytes (a TCP socket, a TLS stream owned by the caller, an
//! in-memory pipe in tests) can drive [`crate::http::Http1Transport`].
//!

#![allow(missing_docs)]
#![deny(unsafe_code)]

use std::time::Duration;

/// Common error types for network operations
pub mod error;

/// `Connect` / `Connection` over `std::net::TcpStream`
pub mod tcp;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connect, Connection, Read, Write};
}

pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Write the whole buffer, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<(), Self::Error>
    where
        Self::Error: From<error::Error>,
    {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(error::Error::WriteError.into()),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {
    /// Bound every subsequent read and write by `timeout`.
    ///
    /// Connections without a notion of time ignore it.
    fn set_timeout(&mut self, _timeout: Duration) {}
}

/// A synchronous connector (client)
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a connection
    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error>;
}
