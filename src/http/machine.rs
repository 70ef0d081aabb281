//! Execution orchestration behind the request steps.
//!
//! The [`StepMachine`] is shared by every step of every chain started from a
//! [`Client`](super::Client). It holds no per-call state: each chain carries
//! its own [`Request`], and each execution opens and closes its own handle.

use super::codec::JsonCodec;
use super::error::Error;
use super::executor::Executor;
use super::request::{Method, Request};
use super::request_executor::RequestExecutor;
use super::response::Response;
use core::any::{Any, TypeId};
use core::fmt;
use serde::de::DeserializeOwned;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Produces the result of a chain from its final request.
pub(crate) type Runner<T> = fn(&StepMachine, &Request) -> Result<T, Error>;

/// Called with the result of an asynchronous request.
pub type OnSuccess<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// Called with the failure of an asynchronous request.
pub type OnFailure = Box<dyn FnOnce(Error) + Send + 'static>;

pub struct StepMachine {
    executor: RequestExecutor,
    codec: Arc<dyn JsonCodec>,
    tasks: Arc<dyn Executor>,
    timeout: Duration,
}

impl StepMachine {
    pub(crate) fn new(
        executor: RequestExecutor,
        codec: Arc<dyn JsonCodec>,
        tasks: Arc<dyn Executor>,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            codec,
            tasks,
            timeout,
        }
    }

    pub fn codec(&self) -> &dyn JsonCodec {
        self.codec.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Executes `request` and returns the raw response.
    ///
    /// # Errors
    ///
    /// `Argument` for a request without an `http`/`https` URL, `NotOk` when
    /// the status is outside the OK family, or whatever the round trip fails
    /// with.
    pub fn execute_raw(&self, request: &Request) -> Result<Response, Error> {
        request.ensure_ready()?;

        log::debug!("Executing {}", request);
        let response = self
            .executor
            .execute(request, self.codec.as_ref(), self.timeout)?;

        if !response.is_ok() {
            log::debug!("Received non-OK response for {}: {}", request, response);
            return Err(Error::not_ok(request, response));
        }

        log::trace!("Received {} for {}", response, request);
        Ok(response)
    }

    /// Executes `request` and decodes the body into `T`.
    ///
    /// A `String` target receives [`Response::body_as_string`] without a
    /// second JSON pass. `()` is not a response type.
    pub fn execute_sync<T>(&self, request: &Request) -> Result<T, Error>
    where
        T: DeserializeOwned + 'static,
    {
        ensure_response_type::<T>()?;

        let response = self.execute_raw(request)?;

        if TypeId::of::<T>() == TypeId::of::<String>() {
            let text: Box<dyn Any> = Box::new(response.body_as_string());
            return text
                .downcast::<T>()
                .map(|value| *value)
                .map_err(|_| Error::operation_failed("string conversion failed").with_request(request));
        }

        let value = response.body_as::<T>().map_err(|e| e.with_request(request))?;
        log::trace!("Decoded response of {} as {}", request, core::any::type_name::<T>());
        Ok(value)
    }

    /// Validates `request`, then schedules `run` on the task executor.
    ///
    /// Every failure of the scheduled work, including a panic in `run` or in
    /// `on_success`, reaches `on_failure`. Exactly one of the two callbacks
    /// is called.
    pub(crate) fn execute_async<T>(
        self: &Arc<Self>,
        request: Request,
        run: Runner<T>,
        on_success: OnSuccess<T>,
        on_failure: OnFailure,
    ) -> Result<(), Error>
    where
        T: Send + 'static,
    {
        request.ensure_ready()?;

        log::debug!("Submitting async request {}", request);
        let machine = Arc::clone(self);
        self.tasks.execute(Box::new(move || {
            machine.run_task(request, run, on_success, on_failure);
        }));
        Ok(())
    }

    fn run_task<T>(&self, request: Request, run: Runner<T>, on_success: OnSuccess<T>, on_failure: OnFailure) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(self, &request))).unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            log::error!("Request {} panicked: {}", request, message);
            Err(Error::operation_failed(format!("request panicked: {}", message)).with_request(&request))
        });

        let failure = match outcome {
            Ok(value) => match panic::catch_unwind(AssertUnwindSafe(move || on_success(value))) {
                Ok(()) => return,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::warn!("Success callback for {} panicked: {}", request, message);
                    Error::operation_failed(format!("success callback panicked: {}", message))
                        .with_request(&request)
                }
            },
            Err(err) => {
                log::error!("Failed to execute {}: {}", request, err);
                err
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(move || on_failure(failure))).is_err() {
            log::error!("Failure callback for {} panicked", request);
        }
    }

    /// Fetches `url` with a GET and returns the raw body bytes.
    pub fn download(&self, template: &Request, url: Url) -> Result<Vec<u8>, Error> {
        let request = Request::builder()
            .method(Method::Get)
            .url(url)
            .headers(template.headers().clone())
            .build();
        request.ensure_ready()?;

        log::debug!("Downloading {}", request);
        self.executor
            .download(&request, self.codec.as_ref(), self.timeout)
    }
}

impl fmt::Debug for StepMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepMachine")
            .field("executor", &self.executor)
            .field("codec", &self.codec)
            .field("tasks", &self.tasks)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub(crate) fn ensure_response_type<T: 'static>() -> Result<(), Error> {
    if TypeId::of::<T>() == TypeId::of::<()>() {
        return Err(Error::argument("a response type is required, () is not one"));
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::codec::SerdeJsonCodec;
    use crate::http::executor::InlineExecutor;
    use crate::http::transport::{Handle, Transport};
    use crate::http::ErrorKind;
    use crate::network::error::Error as NetworkError;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Refusing;

    impl Transport for Refusing {
        fn open(&self, _url: &Url) -> Result<Box<dyn Handle>, NetworkError> {
            Err(NetworkError::ConnectionRefused)
        }
    }

    fn machine() -> Arc<StepMachine> {
        Arc::new(StepMachine::new(
            RequestExecutor::with_transport(Arc::new(Refusing)),
            Arc::new(SerdeJsonCodec),
            Arc::new(InlineExecutor),
            Duration::from_secs(1),
        ))
    }

    fn request() -> Request {
        Request::builder()
            .url(Url::parse("http://localhost:1/nowhere").unwrap())
            .build()
    }

    #[test]
    fn test_unit_is_not_a_response_type() {
        let err = machine().execute_sync::<()>(&request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_missing_url_is_argument_error() {
        let err = machine()
            .execute_raw(&Request::builder().build())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_refused_connection() {
        let err = machine().execute_raw(&request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(err.request(), Some(&request()));
    }

    #[test]
    fn test_async_failure_reaches_failure_callback() {
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = failures.clone();

        machine()
            .execute_async(
                request(),
                StepMachine::execute_raw,
                Box::new(|_| panic!("must not succeed")),
                Box::new(move |e| sink.lock().unwrap().push(e.kind())),
            )
            .unwrap();

        assert_eq!(*failures.lock().unwrap(), vec![ErrorKind::Connection]);
    }

    #[test]
    fn test_async_panicking_runner() {
        fn explode(_: &StepMachine, _: &Request) -> Result<u8, Error> {
            panic!("runner exploded")
        }

        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = failures.clone();

        machine()
            .execute_async(
                request(),
                explode,
                Box::new(|_| {}),
                Box::new(move |e| sink.lock().unwrap().push(e.to_string())),
            )
            .unwrap();

        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("runner exploded"));
    }

    #[test]
    fn test_async_success_callback_panic_is_rerouted() {
        fn ok(_: &StepMachine, _: &Request) -> Result<u8, Error> {
            Ok(7)
        }

        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = failures.clone();

        machine()
            .execute_async(
                request(),
                ok,
                Box::new(|_| panic!("callback exploded")),
                Box::new(move |e| sink.lock().unwrap().push(e)),
            )
            .unwrap();

        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind(), ErrorKind::OperationFailed);
        assert!(failures[0].to_string().contains("success callback panicked"));
    }

    #[test]
    fn test_async_validates_before_scheduling() {
        let err = machine()
            .execute_async(
                Request::builder().build(),
                StepMachine::execute_raw,
                Box::new(|_| {}),
                Box::new(|_| panic!("must not be scheduled")),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
