//! Error types for the HTTP layer.

use super::request::Request;
use super::response::Response;
use crate::network::error::Error as NetworkError;

/// The kind of an [`Error`], for callers that only need to branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid caller input, reported at the call that received it.
    Argument,
    /// The server could not be reached: name resolution, refusal, timeout.
    Connection,
    /// Malformed JSON in a request body string or a response body.
    Json,
    /// Any other I/O or mapping failure.
    OperationFailed,
    /// The exchange completed but the status is outside the OK family.
    NotOk,
}

/// Everything that can go wrong while building or executing a request.
///
/// Variants other than `Argument` may carry the request that was being
/// executed; `NotOk` always carries both the request and the response.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("{message}: {source}")]
    Connection {
        message: String,
        request: Option<Box<Request>>,
        #[source]
        source: NetworkError,
    },

    #[error("{message}")]
    Json {
        message: String,
        request: Option<Box<Request>>,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("{message}")]
    OperationFailed {
        message: String,
        request: Option<Box<Request>>,
        #[source]
        source: Option<NetworkError>,
    },

    #[error("HTTP response not OK, status code: {}", .response.status_code())]
    NotOk {
        request: Box<Request>,
        response: Box<Response>,
    },
}

impl Error {
    pub(crate) fn argument(message: impl Into<String>) -> Self {
        Error::Argument(message.into())
    }

    pub(crate) fn connection(message: impl Into<String>, source: NetworkError) -> Self {
        Error::Connection {
            message: message.into(),
            request: None,
            source,
        }
    }

    pub(crate) fn json(message: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Json {
            message: message.into(),
            request: None,
            source: Some(source),
        }
    }

    pub(crate) fn operation_failed(message: impl Into<String>) -> Self {
        Error::OperationFailed {
            message: message.into(),
            request: None,
            source: None,
        }
    }

    pub(crate) fn io(message: impl Into<String>, source: NetworkError) -> Self {
        Error::OperationFailed {
            message: message.into(),
            request: None,
            source: Some(source),
        }
    }

    /// Translates a transport failure: connectivity problems become
    /// `Connection`, everything else `OperationFailed`.
    pub(crate) fn from_network(message: impl Into<String>, source: NetworkError) -> Self {
        if source.is_connectivity() {
            Error::connection(message, source)
        } else {
            Error::io(message, source)
        }
    }

    pub(crate) fn not_ok(request: &Request, response: Response) -> Self {
        Error::NotOk {
            request: Box::new(request.clone()),
            response: Box::new(response),
        }
    }

    /// Attaches `request` unless the error already carries one.
    pub(crate) fn with_request(mut self, request: &Request) -> Self {
        match &mut self {
            Error::Connection { request: slot, .. }
            | Error::Json { request: slot, .. }
            | Error::OperationFailed { request: slot, .. } => {
                if slot.is_none() {
                    *slot = Some(Box::new(request.clone()));
                }
            }
            Error::Argument(_) | Error::NotOk { .. } => {}
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Argument(_) => ErrorKind::Argument,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Json { .. } => ErrorKind::Json,
            Error::OperationFailed { .. } => ErrorKind::OperationFailed,
            Error::NotOk { .. } => ErrorKind::NotOk,
        }
    }

    /// The request being executed when the error happened, if known.
    pub fn request(&self) -> Option<&Request> {
        match self {
            Error::Connection { request, .. }
            | Error::Json { request, .. }
            | Error::OperationFailed { request, .. } => request.as_deref(),
            Error::NotOk { request, .. } => Some(&**request),
            Error::Argument(_) => None,
        }
    }

    /// The response that was received, only present for `NotOk`.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::NotOk { response, .. } => Some(&**response),
            _ => None,
        }
    }

    pub fn is_connection(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ErrorKind {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ErrorKind::Argument => defmt::write!(f, "Argument"),
            ErrorKind::Connection => defmt::write!(f, "Connection"),
            ErrorKind::Json => defmt::write!(f, "Json"),
            ErrorKind::OperationFailed => defmt::write!(f, "OperationFailed"),
            ErrorKind::NotOk => defmt::write!(f, "NotOk"),
        }
    }
}
