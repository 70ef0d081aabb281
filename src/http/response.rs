use super::codec;
use super::error::Error;
use super::fields::Fields;
use super::status::StatusCode;
use core::fmt;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Lowest status code a response may carry.
pub const MIN_STATUS_CODE: u16 = 100;
/// Highest status code a response may carry.
pub const MAX_STATUS_CODE: u16 = 600;

/// An immutable, fully buffered HTTP response.
///
/// The body is always a JSON tree. A response that had no content holds
/// `Value::Null`, and a response whose content type was not JSON holds its
/// text as a JSON string leaf. Typed views are decoded from the tree on
/// demand and never change the response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status_code: u16,
    headers: Fields,
    body: Value,
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// Builds a response, rejecting status codes outside 100..=600.
    pub fn new(status_code: u16, headers: Fields, body: Value) -> Result<Self, Error> {
        if !(MIN_STATUS_CODE..=MAX_STATUS_CODE).contains(&status_code) {
            return Err(Error::argument(format!(
                "invalid HTTP status code: {}",
                status_code
            )));
        }
        Ok(Self {
            status_code,
            headers,
            body,
        })
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The named status, when the code is a well-known one.
    pub fn status(&self) -> Option<StatusCode> {
        StatusCode::for_code(self.status_code)
    }

    /// `true` for 200 through 208, and for 226.
    pub fn is_ok(&self) -> bool {
        StatusCode::is_ok_code(self.status_code)
    }

    /// Response headers; multi-valued headers are joined with `", "`.
    pub fn headers(&self) -> &Fields {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_ignore_case(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// The body as text: a string leaf is returned as-is, any other tree is
    /// rendered as JSON.
    pub fn body_as_string(&self) -> String {
        match &self.body {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    /// Decodes the body into `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        codec::from_tree(&self.body).map_err(|e| {
            Error::json(
                format!("failed to parse json to {}", core::any::type_name::<T>()),
                e,
            )
        })
    }

    /// Decodes a JSON array body into a list of `T`. A JSON-null body is an
    /// empty list.
    pub fn body_as_array_of<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        codec::array_from_tree(&self.body).map_err(|e| {
            Error::json(
                format!(
                    "failed to parse json to a list of {}",
                    core::any::type_name::<T>()
                ),
                e,
            )
        })
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Response{{status_code={}, headers={}, body={}}}",
            self.status_code, self.headers, self.body
        )
    }
}

/// Builder for [`Response`]. The status code is mandatory.
#[derive(Debug, Clone, Default)]
pub struct ResponseBuilder {
    status_code: Option<u16>,
    headers: Fields,
    body: Option<Value>,
}

impl ResponseBuilder {
    pub fn status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: Fields) -> Self {
        self.headers = headers;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(self) -> Result<Response, Error> {
        let Some(status_code) = self.status_code else {
            return Err(Error::argument("missing status code"));
        };
        Response::new(status_code, self.headers, self.body.unwrap_or(Value::Null))
    }
}

impl From<&Response> for ResponseBuilder {
    fn from(response: &Response) -> Self {
        Self {
            status_code: Some(response.status_code),
            headers: response.headers.clone(),
            body: Some(response.body.clone()),
        }
    }
}
