//! The client facade and its configuration.

use super::codec::{JsonCodec, SerdeJsonCodec};
use super::error::Error;
use super::executor::{Executor, InlineExecutor, ThreadExecutor};
use super::fields::Fields;
use super::h1::Http1Transport;
use super::machine::StepMachine;
use super::request::Request;
use super::request_executor::RequestExecutor;
use super::steps::Step1;
use super::transport::Transport;
use crate::network::tcp::TcpConnector;
use std::sync::Arc;
use std::time::Duration;

/// The timeout applied to every request unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

const USER_AGENT: &str = concat!("jsonstep/", env!("CARGO_PKG_VERSION"));

/// The headers every client starts with.
pub fn default_headers() -> Fields {
    [
        ("Accept", "application/json, text/plain"),
        ("User-Agent", USER_AGENT),
        ("Content-Type", "application/json; charset=UTF-8"),
    ]
    .into_iter()
    .collect()
}

/// Entry point for making requests.
///
/// A client is immutable and cheap to clone. Its default headers are copied
/// into every request started with [`Client::go`].
///
/// ```no_run
/// use jsonstep::Client;
///
/// # fn main() -> Result<(), jsonstep::Error> {
/// let client = Client::new();
/// let response = client
///     .go()
///     .get()
///     .using_query_param("page", 2)?
///     .at("http://localhost:8080/things")?;
/// println!("{}", response.body());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    default_headers: Fields,
    machine: Arc<StepMachine>,
}

impl Client {
    /// A client with the default configuration: HTTP/1.1 over TCP,
    /// `serde_json`, inline callbacks and a 45 second timeout.
    pub fn new() -> Self {
        ClientBuilder::default().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn default_headers(&self) -> &Fields {
        &self.default_headers
    }

    /// A new client with one default header replaced or added.
    pub fn using_default_header(&self, key: &str, value: &str) -> Result<Client, Error> {
        if key.is_empty() {
            return Err(Error::argument("missing header key"));
        }
        let mut default_headers = self.default_headers.clone();
        default_headers.insert(key, value);
        Ok(Client {
            default_headers,
            machine: self.machine.clone(),
        })
    }

    /// Starts a new request.
    pub fn go(&self) -> Step1 {
        let request = Request::builder()
            .headers(self.default_headers.clone())
            .build();
        Step1::new(self.machine.clone(), request)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Configures and builds a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    codec: Arc<dyn JsonCodec>,
    executor: Arc<dyn Executor>,
    timeout: Duration,
    default_headers: Fields,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            transport: None,
            codec: Arc::new(SerdeJsonCodec),
            executor: Arc::new(InlineExecutor),
            timeout: DEFAULT_TIMEOUT,
            default_headers: default_headers(),
        }
    }
}

impl ClientBuilder {
    pub fn using_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn using_codec(mut self, codec: Arc<dyn JsonCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Runs asynchronous requests and their callbacks on `executor`.
    pub fn using_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Runs asynchronous requests on a dedicated worker thread.
    ///
    /// # Errors
    ///
    /// `OperationFailed` if the worker thread cannot be spawned.
    pub fn enable_async_callbacks(self) -> Result<Self, Error> {
        let executor = ThreadExecutor::new()
            .map_err(|e| Error::operation_failed(format!("could not start async worker: {}", e)))?;
        Ok(self.using_executor(Arc::new(executor)))
    }

    /// Runs asynchronous requests on the calling thread.
    pub fn disable_async_callbacks(self) -> Self {
        self.using_executor(Arc::new(InlineExecutor))
    }

    pub fn using_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
        if timeout.is_zero() {
            return Err(Error::argument("timeout must be positive"));
        }
        self.timeout = timeout;
        Ok(self)
    }

    /// Replaces every default header.
    pub fn using_default_headers(mut self, headers: Fields) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn using_default_header(mut self, key: &str, value: &str) -> Result<Self, Error> {
        if key.is_empty() {
            return Err(Error::argument("missing header key"));
        }
        self.default_headers.insert(key, value);
        Ok(self)
    }

    pub fn build(self) -> Client {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(default_transport(self.timeout)),
        };

        let machine = StepMachine::new(
            RequestExecutor::with_transport(transport),
            self.codec,
            self.executor,
            self.timeout,
        );

        Client {
            default_headers: self.default_headers,
            machine: Arc::new(machine),
        }
    }
}

/// Plain TCP, giving up on connects that outlast the request timeout.
fn default_transport(timeout: Duration) -> Http1Transport<TcpConnector> {
    Http1Transport::new(TcpConnector::new().with_connect_timeout(timeout))
}
