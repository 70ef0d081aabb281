use super::error::Error;
use super::request::Request;
use super::transport::{Handle, Transport};
use std::sync::Arc;

/// Maps a ready [`Request`] onto an open transport [`Handle`].
///
/// The handle is returned open; closing it is the caller's job.
#[derive(Debug, Clone)]
pub struct ConnectionPreparer {
    transport: Arc<dyn Transport>,
}

impl ConnectionPreparer {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Resolves the final URL, opens a handle and applies the method, every
    /// header and, when there is a body, output mode.
    ///
    /// # Errors
    ///
    /// * `OperationFailed` - missing URL, a URL that is not HTTP(S), or one
    ///   the transport cannot map to a connection
    /// * `Connection` - the transport could not reach the server
    pub fn prepare(&self, request: &Request) -> Result<Box<dyn Handle>, Error> {
        let url = request.expanded_url()?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(
                Error::operation_failed(format!("URL is not an HTTP URL: [{}]", url))
                    .with_request(request),
            );
        }

        let mut handle = self.transport.open(&url).map_err(|e| {
            log::debug!("Could not open connection to {}: {}", url, e);
            let message = if e.is_connectivity() {
                format!("could not connect to server @[{}]", url)
            } else {
                format!("could not map [{}] to a connection", url)
            };
            Error::from_network(message, e).with_request(request)
        })?;

        handle.set_method(request.method());
        for (name, value) in request.headers().iter() {
            handle.set_header(name, value);
        }
        if request.has_body() {
            handle.set_output(true);
        }

        Ok(handle)
    }
}
