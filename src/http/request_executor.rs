use super::codec::{self, JsonCodec};
use super::error::Error;
use super::fields::Fields;
use super::preparer::ConnectionPreparer;
use super::request::Request;
use super::response::Response;
use super::status::StatusCode;
use super::transport::{Handle, Transport};
use crate::network::error::Error as NetworkError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Performs one request/response round trip.
///
/// The handle opened for a request is owned by a single [`execute`] call and
/// is closed before that call returns, whatever the outcome.
///
/// [`execute`]: RequestExecutor::execute
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    preparer: ConnectionPreparer,
}

impl RequestExecutor {
    pub fn new(preparer: ConnectionPreparer) -> Self {
        Self { preparer }
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self::new(ConnectionPreparer::new(transport))
    }

    /// Sends `request` and builds the [`Response`].
    ///
    /// The body is parsed as JSON only when the response declares a JSON
    /// content type; any other content is kept as a JSON string leaf, and an
    /// empty body becomes JSON null.
    ///
    /// # Errors
    ///
    /// * `Argument` - `timeout` is zero
    /// * `Connection` - the server could not be reached, or timed out
    /// * `Json` - the request body could not be encoded or the response body
    ///   is malformed JSON
    /// * `OperationFailed` - any other transport or mapping failure
    pub fn execute(
        &self,
        request: &Request,
        codec: &dyn JsonCodec,
        timeout: Duration,
    ) -> Result<Response, Error> {
        self.round_trip(request, codec, timeout, |reply| reply.into_response(request, codec))
    }

    /// Sends `request` and returns the response body untouched.
    ///
    /// A status outside the OK family is reported as `NotOk`, with the body
    /// carried as a string leaf.
    pub fn download(
        &self,
        request: &Request,
        codec: &dyn JsonCodec,
        timeout: Duration,
    ) -> Result<Vec<u8>, Error> {
        self.round_trip(request, codec, timeout, |reply| {
            if StatusCode::is_ok_code(reply.status_code) {
                return Ok(reply.body);
            }
            let text = String::from_utf8_lossy(&reply.body).into_owned();
            let response = Response::new(reply.status_code, reply.headers, Value::String(text))
                .map_err(|e| Error::operation_failed(e.to_string()).with_request(request))?;
            Err(Error::not_ok(request, response))
        })
    }

    fn round_trip<T>(
        &self,
        request: &Request,
        codec: &dyn JsonCodec,
        timeout: Duration,
        finish: impl FnOnce(Reply) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if timeout.is_zero() {
            return Err(Error::argument("timeout must be positive"));
        }

        let mut handle = self.preparer.prepare(request)?;
        handle.set_timeout(timeout);

        let outcome = exchange(request, codec, handle.as_mut()).and_then(finish);

        match (outcome, handle.close()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => {
                log::error!("Failed to close connection for {}: {}", request, e);
                Err(Error::io("failed to close connection", e).with_request(request))
            }
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(e)) => {
                log::warn!("Also failed to close connection for {}: {}", request, e);
                Err(err)
            }
        }
    }
}

/// What came back over the wire, before the body is interpreted.
struct Reply {
    status_code: u16,
    headers: Fields,
    body: Vec<u8>,
}

impl Reply {
    fn into_response(self, request: &Request, codec: &dyn JsonCodec) -> Result<Response, Error> {
        let body = parse_body(
            request,
            codec,
            &self.body,
            self.headers.get_ignore_case("Content-Type"),
        )?;

        Response::new(self.status_code, self.headers, body).map_err(|e| {
            log::error!("Could not build response for {}: {}", request, e);
            Error::operation_failed(e.to_string()).with_request(request)
        })
    }
}

fn exchange(request: &Request, codec: &dyn JsonCodec, handle: &mut dyn Handle) -> Result<Reply, Error> {
    if let Some(body) = request.body() {
        write_body(request, codec, handle, body)?;
    }

    let body = handle.read().map_err(|e| {
        log::error!("Failed to make request [{}]: {}", request, e);
        read_error(request, e)
    })?;

    let status_code = handle.status_code().ok_or_else(|| {
        Error::operation_failed("response is missing a status code").with_request(request)
    })?;

    Ok(Reply {
        status_code,
        headers: combine_headers(handle.response_headers()),
        body,
    })
}

fn write_body(
    request: &Request,
    codec: &dyn JsonCodec,
    handle: &mut dyn Handle,
    body: &Value,
) -> Result<(), Error> {
    let bytes = codec
        .encode_tree(body)
        .map_err(|e| Error::json("failed to encode json request body", e).with_request(request))?;

    handle.write(&bytes).map_err(|e| {
        log::error!("Failed to set json request body [{}]: {}", body, e);
        let message = if e.is_connectivity() {
            format!("could not connect to server @[{}]", url_of(request))
        } else {
            format!("failed to set json request body [{}]", body)
        };
        Error::from_network(message, e).with_request(request)
    })
}

fn read_error(request: &Request, e: NetworkError) -> Error {
    let message = match e {
        NetworkError::Timeout => format!("HTTP request to [{}] timed out", url_of(request)),
        _ if e.is_connectivity() => format!("could not connect to server @[{}]", url_of(request)),
        _ => format!("request failed [{}]", request),
    };
    Error::from_network(message, e).with_request(request)
}

fn parse_body(
    request: &Request,
    codec: &dyn JsonCodec,
    raw: &[u8],
    content_type: Option<&str>,
) -> Result<Value, Error> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }

    let is_json = content_type.is_some_and(codec::is_json_content_type);
    if !is_json {
        return Ok(Value::String(String::from_utf8_lossy(raw).into_owned()));
    }

    codec.decode_tree(raw).map_err(|e| {
        log::error!("Could not parse response from request {}: {}", request, e);
        Error::json("failed to parse json response body", e).with_request(request)
    })
}

/// Folds repeated header lines into one entry, values joined with `", "`.
fn combine_headers(raw: Vec<(String, String)>) -> Fields {
    let mut headers = Fields::new();
    for (name, value) in raw {
        let combined = match headers.get(&name) {
            Some(existing) => format!("{}, {}", existing, value),
            None => value,
        };
        headers.insert(name, combined);
    }
    headers
}

fn url_of(request: &Request) -> String {
    request
        .url()
        .map(|url| url.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::codec::SerdeJsonCodec;
    use serde_json::json;

    #[test]
    fn test_combine_headers() {
        let headers = combine_headers(vec![
            ("Set-Cookie".into(), "a=1".into()),
            ("Content-Type".into(), "text/plain".into()),
            ("Set-Cookie".into(), "b=2".into()),
        ]);
        assert_eq!(headers.get("Set-Cookie"), Some("a=1, b=2"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_parse_body_content_negotiation() {
        let request = Request::builder().build();
        let codec = SerdeJsonCodec;

        let json_body = parse_body(&request, &codec, br#"{"a":1}"#, Some("application/json")).unwrap();
        assert_eq!(json_body, json!({"a": 1}));

        let text = parse_body(&request, &codec, b"hello", Some("text/plain")).unwrap();
        assert_eq!(text.to_string(), "\"hello\"");

        let untyped = parse_body(&request, &codec, br#"{"a":1}"#, None).unwrap();
        assert_eq!(untyped, json!("{\"a\":1}"));

        let empty = parse_body(&request, &codec, b"", Some("application/json")).unwrap();
        assert_eq!(empty, Value::Null);
    }

    #[test]
    fn test_parse_body_malformed_json() {
        let request = Request::builder().build();
        let err = parse_body(&request, &SerdeJsonCodec, b"{oops", Some("application/json")).unwrap_err();
        assert_eq!(err.kind(), crate::http::ErrorKind::Json);
        assert_eq!(err.request(), Some(&request));
    }

    #[test]
    fn test_read_error_translation() {
        let request = Request::builder().build();
        assert!(read_error(&request, NetworkError::Timeout).is_connection());
        assert!(read_error(&request, NetworkError::ConnectionRefused).is_connection());
        assert!(!read_error(&request, NetworkError::ProtocolError).is_connection());
    }
}
