use super::error::Error;
use super::fields::Fields;
use core::fmt;
use serde_json::Value;
use url::Url;

/// An HTTP request method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Trace,
    /// Any other token, sent verbatim.
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Other(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion into an absolute [`Url`], failing with an argument error.
pub trait IntoUrl {
    /// Parses or passes through the URL.
    fn into_url(self) -> Result<Url, Error>;
}

impl IntoUrl for Url {
    fn into_url(self) -> Result<Url, Error> {
        Ok(self)
    }
}

impl IntoUrl for &Url {
    fn into_url(self) -> Result<Url, Error> {
        Ok(self.clone())
    }
}

impl IntoUrl for &str {
    fn into_url(self) -> Result<Url, Error> {
        if self.is_empty() {
            return Err(Error::argument("missing URL"));
        }
        Url::parse(self).map_err(|e| Error::argument(format!("not a valid URL [{}]: {}", self, e)))
    }
}

impl IntoUrl for String {
    fn into_url(self) -> Result<Url, Error> {
        self.as_str().into_url()
    }
}

impl IntoUrl for &String {
    fn into_url(self) -> Result<Url, Error> {
        self.as_str().into_url()
    }
}

/// An immutable description of one outgoing HTTP request.
///
/// A `Request` is never changed after it is built. Every `with_*` method
/// returns a new request that differs from `self` in exactly one field, which
/// is how each step of a request chain refines the request it received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    method: Method,
    url: Option<Url>,
    headers: Fields,
    query_params: Fields,
    body: Option<Value>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// A structurally equal, independent copy of `other`.
    pub fn copy_of(other: &Request) -> Request {
        RequestBuilder::from(other).build()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn headers(&self) -> &Fields {
        &self.headers
    }

    pub fn query_params(&self) -> &Fields {
        &self.query_params
    }

    /// The JSON body. `None` means no body was chosen, which is not the same
    /// as a body that is the JSON literal `null`.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Whether there is a body to put on the wire. A JSON-null body counts.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn has_query_params(&self) -> bool {
        !self.query_params.is_empty()
    }

    pub fn with_method(&self, method: Method) -> Request {
        RequestBuilder::from(self).method(method).build()
    }

    pub fn with_url(&self, url: Url) -> Request {
        RequestBuilder::from(self).url(url).build()
    }

    pub fn with_headers(&self, headers: Fields) -> Request {
        RequestBuilder::from(self).headers(headers).build()
    }

    /// Merges one header into the existing ones; the last write wins.
    pub fn with_header(&self, name: impl Into<String>, value: impl Into<String>) -> Request {
        let mut headers = self.headers.clone();
        headers.insert(name, value);
        self.with_headers(headers)
    }

    pub fn with_query_params(&self, query_params: Fields) -> Request {
        RequestBuilder::from(self).query_params(query_params).build()
    }

    /// Merges one query parameter into the existing ones; the last write wins.
    pub fn with_query_param(&self, name: impl Into<String>, value: impl Into<String>) -> Request {
        let mut params = self.query_params.clone();
        params.insert(name, value);
        self.with_query_params(params)
    }

    pub fn with_body(&self, body: Value) -> Request {
        RequestBuilder::from(self).body(body).build()
    }

    /// The URL with the query parameters appended in insertion order.
    ///
    /// # Errors
    ///
    /// `OperationFailed` when the request has no URL yet.
    pub fn expanded_url(&self) -> Result<Url, Error> {
        let Some(url) = self.url.as_ref() else {
            return Err(Error::operation_failed("request is missing URL").with_request(self));
        };

        let mut url = url.clone();
        if self.has_query_params() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in self.query_params.iter() {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    /// Checks that the request can be executed: an absolute `http` or
    /// `https` URL must be set.
    pub fn ensure_ready(&self) -> Result<(), Error> {
        let Some(url) = self.url.as_ref() else {
            return Err(Error::argument("request missing URL"));
        };
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(Error::argument(format!(
                "request URL must be http or https, not [{}]",
                other
            ))),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => write!(f, "{} {}", self.method, url)?,
            None => write!(f, "{} <no url>", self.method)?,
        }
        if self.has_query_params() {
            write!(f, " params={}", self.query_params)?;
        }
        Ok(())
    }
}

/// A mutable builder producing [`Request`]s.
///
/// A builder that was never given a method builds a `GET` request.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    url: Option<Url>,
    headers: Fields,
    query_params: Fields,
    body: Option<Value>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Replaces all headers.
    pub fn headers(mut self, headers: Fields) -> Self {
        self.headers = headers;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces all query parameters.
    pub fn query_params(mut self, query_params: Fields) -> Self {
        self.query_params = query_params;
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name, value);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method.unwrap_or_default(),
            url: self.url,
            headers: self.headers,
            query_params: self.query_params,
            body: self.body,
        }
    }
}

impl From<&Request> for RequestBuilder {
    fn from(request: &Request) -> Self {
        Self {
            method: Some(request.method.clone()),
            url: request.url.clone(),
            headers: request.headers.clone(),
            query_params: request.query_params.clone(),
            body: request.body.clone(),
        }
    }
}
