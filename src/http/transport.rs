//! The transport capability.
//!
//! The HTTP layer never touches sockets itself. A [`Transport`] opens one
//! [`Handle`] per request; the handle is configured (method, headers,
//! timeout), optionally given a body, read exactly once and then closed.
//! Handles are never shared or reused between requests.

use super::request::Method;
use crate::network::error::Error;
use core::fmt;
use std::time::Duration;
use url::Url;

/// Opens connections for requests.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Opens a handle for `url`.
    ///
    /// # Errors
    ///
    /// * `InvalidAddress` - the URL is malformed or its scheme is unsupported
    /// * `NameResolution` - the host name could not be resolved
    /// * `ConnectionRefused` / `Timeout` - the peer could not be reached
    fn open(&self, url: &Url) -> Result<Box<dyn Handle>, Error>;
}

/// One open exchange with a server.
pub trait Handle: Send {
    fn set_method(&mut self, method: &Method);

    fn set_header(&mut self, name: &str, value: &str);

    fn set_timeout(&mut self, timeout: Duration);

    /// Announces that a body will be written before reading.
    fn set_output(&mut self, enabled: bool);

    fn write(&mut self, body: &[u8]) -> Result<(), Error>;

    /// Sends the request if needed and returns the complete response body.
    fn read(&mut self) -> Result<Vec<u8>, Error>;

    /// The response status, available after a successful [`Handle::read`].
    fn status_code(&self) -> Option<u16>;

    /// The response headers as received, one entry per header line.
    fn response_headers(&self) -> Vec<(String, String)>;

    fn close(self: Box<Self>) -> Result<(), Error>;
}
