//! The request chain.
//!
//! Each step type is one state of a request under construction and exposes
//! exactly the operations that are legal in that state:
//!
//! ```text
//! Step1 --get--------------------------------> Step3
//! Step1 --post/put/delete--> Step2 --body----> Step3
//! Step3 --at(url)--> Response
//! Step3 --expecting::<T>--> Step4<T> --at(url)--> T
//! Step3 / Step4<T> --on_success--> Step5<T> --on_failure--> Step6<T> --at(url)--> (scheduled)
//! ```
//!
//! Steps never mutate the request they hold. Every operation derives a new
//! [`Request`], so a step can be kept and reused to start several requests.

use super::codec;
use super::error::Error;
use super::machine::{self, OnFailure, OnSuccess, Runner, StepMachine};
use super::request::{IntoUrl, Method, Request};
use super::response::Response;
use core::fmt;
use core::marker::PhantomData;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// The first step: choose a method.
#[derive(Debug, Clone)]
pub struct Step1 {
    machine: Arc<StepMachine>,
    request: Request,
}

/// The result of [`Step1::method`]: methods that carry a body go through
/// [`Step2`], the others skip straight to [`Step3`].
#[derive(Debug, Clone)]
pub enum MethodStep {
    Body(Step2),
    Headers(Step3),
}

impl Step1 {
    pub(crate) fn new(machine: Arc<StepMachine>, request: Request) -> Self {
        log::debug!("Beginning new request chain");
        Self { machine, request }
    }

    pub fn get(&self) -> Step3 {
        Step3::new(self.machine.clone(), self.request.with_method(Method::Get))
    }

    pub fn post(&self) -> Step2 {
        Step2::new(self.machine.clone(), self.request.with_method(Method::Post))
    }

    pub fn put(&self) -> Step2 {
        Step2::new(self.machine.clone(), self.request.with_method(Method::Put))
    }

    pub fn delete(&self) -> Step2 {
        Step2::new(self.machine.clone(), self.request.with_method(Method::Delete))
    }

    /// Uses any method. `GET`, `HEAD`, `OPTIONS` and `TRACE` have no body
    /// step; everything else does.
    pub fn method(&self, method: Method) -> MethodStep {
        let takes_body = !matches!(
            method,
            Method::Get | Method::Head | Method::Options | Method::Trace
        );
        let request = self.request.with_method(method);

        if takes_body {
            MethodStep::Body(Step2::new(self.machine.clone(), request))
        } else {
            MethodStep::Headers(Step3::new(self.machine.clone(), request))
        }
    }

    /// Fetches the raw bytes at `url`, bypassing JSON handling entirely.
    pub fn download(&self, url: impl IntoUrl) -> Result<Vec<u8>, Error> {
        let url = url.into_url()?;
        self.machine.download(&self.request, url)
    }
}

/// The body step, reached for methods that may carry a body.
#[derive(Debug, Clone)]
pub struct Step2 {
    machine: Arc<StepMachine>,
    request: Request,
}

impl Step2 {
    fn new(machine: Arc<StepMachine>, request: Request) -> Self {
        Self { machine, request }
    }

    /// Sends no body. The request body becomes JSON `null`.
    pub fn no_body(&self) -> Step3 {
        Step3::new(self.machine.clone(), self.request.with_body(Value::Null))
    }

    /// Same as [`Step2::no_body`].
    pub fn nothing(&self) -> Step3 {
        self.no_body()
    }

    /// Uses `json` as the body after checking that it parses.
    ///
    /// # Errors
    ///
    /// `Argument` for an empty string, `Json` for malformed JSON.
    pub fn body_json(&self, json: &str) -> Result<Step3, Error> {
        if json.is_empty() {
            return Err(Error::argument("empty JSON body, use no_body() instead"));
        }

        let tree = self.machine.codec().decode_tree(json.as_bytes()).map_err(|e| {
            log::debug!("Malformed JSON body [{}]: {}", json, e);
            Error::json(format!("failed to parse JSON body [{}]", json), e)
        })?;

        Ok(Step3::new(self.machine.clone(), self.request.with_body(tree)))
    }

    /// Serializes `value` as the body.
    ///
    /// # Errors
    ///
    /// `Argument` if `value` serializes to an empty string, `Json` if it
    /// cannot be serialized.
    pub fn body<T: Serialize + ?Sized>(&self, value: &T) -> Result<Step3, Error> {
        let tree = codec::to_tree(value).map_err(|e| {
            log::error!("Could not convert {} to JSON: {}", core::any::type_name::<T>(), e);
            Error::json("could not convert body to JSON", e)
        })?;

        if matches!(&tree, Value::String(s) if s.is_empty()) {
            return Err(Error::argument("empty body, use no_body() instead"));
        }

        Ok(Step3::new(self.machine.clone(), self.request.with_body(tree)))
    }
}

/// Headers, query parameters and the choice of response handling.
#[derive(Debug, Clone)]
pub struct Step3 {
    machine: Arc<StepMachine>,
    request: Request,
}

impl Step3 {
    fn new(machine: Arc<StepMachine>, request: Request) -> Self {
        Self { machine, request }
    }

    /// The request built so far.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Sets one header, replacing any previous value. The value may be empty.
    pub fn using_header(&self, key: &str, value: &str) -> Result<Step3, Error> {
        if key.is_empty() {
            return Err(Error::argument("missing header key"));
        }
        Ok(Step3::new(self.machine.clone(), self.request.with_header(key, value)))
    }

    /// Sets one query parameter. Numbers and booleans are rendered with
    /// `Display`.
    pub fn using_query_param(&self, name: &str, value: impl fmt::Display) -> Result<Step3, Error> {
        if name.is_empty() {
            return Err(Error::argument("missing query parameter name"));
        }
        let value = value.to_string();
        if value.is_empty() {
            return Err(Error::argument(format!("missing value for query parameter [{}]", name)));
        }
        Ok(Step3::new(
            self.machine.clone(),
            self.request.with_query_param(name, value),
        ))
    }

    /// Sets `Accept` to `media_type` followed by `others`, without duplicates.
    pub fn accept(&self, media_type: &str, others: &[&str]) -> Result<Step3, Error> {
        let mut accepted: Vec<&str> = Vec::with_capacity(others.len() + 1);
        for candidate in core::iter::once(media_type).chain(others.iter().copied()) {
            if candidate.is_empty() {
                return Err(Error::argument("empty media type"));
            }
            if !accepted.contains(&candidate) {
                accepted.push(candidate);
            }
        }
        self.using_header("Accept", &accepted.join(","))
    }

    /// Accepted for compatibility; redirects are not followed.
    pub fn follow_redirects(&self, max: u32) -> Result<Step3, Error> {
        if max < 1 {
            return Err(Error::argument("redirect limit must be at least 1"));
        }
        log::debug!("Redirect following is not implemented, ignoring limit {}", max);
        Ok(self.clone())
    }

    /// Executes the request synchronously and returns the raw response.
    pub fn at(&self, url: impl IntoUrl) -> Result<Response, Error> {
        let request = self.request.with_url(url.into_url()?);
        self.machine.execute_raw(&request)
    }

    /// Switches to asynchronous execution with the raw response.
    pub fn on_success(&self, on_success: impl FnOnce(Response) + Send + 'static) -> Step5<Response> {
        Step5::new(
            self.machine.clone(),
            self.request.clone(),
            StepMachine::execute_raw,
            Box::new(on_success),
        )
    }

    /// Decodes the response body into `T`.
    ///
    /// # Errors
    ///
    /// `Argument` when `T` is `()`.
    pub fn expecting<T>(&self) -> Result<Step4<T>, Error>
    where
        T: DeserializeOwned + Send + 'static,
    {
        machine::ensure_response_type::<T>()?;
        Ok(Step4 {
            machine: self.machine.clone(),
            request: self.request.clone(),
            _response: PhantomData,
        })
    }
}

/// A request whose response will be decoded into `T`.
pub struct Step4<T> {
    machine: Arc<StepMachine>,
    request: Request,
    _response: PhantomData<fn() -> T>,
}

impl<T> Step4<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Executes the request synchronously and decodes the body.
    pub fn at(&self, url: impl IntoUrl) -> Result<T, Error> {
        let request = self.request.with_url(url.into_url()?);
        self.machine.execute_sync::<T>(&request)
    }

    /// Switches to asynchronous execution.
    pub fn on_success(&self, on_success: impl FnOnce(T) + Send + 'static) -> Step5<T> {
        Step5::new(
            self.machine.clone(),
            self.request.clone(),
            StepMachine::execute_sync::<T>,
            Box::new(on_success),
        )
    }
}

impl<T> Clone for Step4<T> {
    fn clone(&self) -> Self {
        Self {
            machine: self.machine.clone(),
            request: self.request.clone(),
            _response: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Step4<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step4")
            .field("request", &self.request)
            .field("response", &core::any::type_name::<T>())
            .finish()
    }
}

/// An asynchronous request that still needs a failure callback.
pub struct Step5<T> {
    machine: Arc<StepMachine>,
    request: Request,
    run: Runner<T>,
    on_success: OnSuccess<T>,
}

impl<T: Send + 'static> Step5<T> {
    fn new(machine: Arc<StepMachine>, request: Request, run: Runner<T>, on_success: OnSuccess<T>) -> Self {
        Self {
            machine,
            request,
            run,
            on_success,
        }
    }

    pub fn on_failure(self, on_failure: impl FnOnce(Error) + Send + 'static) -> Step6<T> {
        Step6 {
            machine: self.machine,
            request: self.request,
            run: self.run,
            on_success: self.on_success,
            on_failure: Box::new(on_failure),
        }
    }
}

impl<T> fmt::Debug for Step5<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step5")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// An asynchronous request ready to be scheduled.
pub struct Step6<T> {
    machine: Arc<StepMachine>,
    request: Request,
    run: Runner<T>,
    on_success: OnSuccess<T>,
    on_failure: OnFailure,
}

impl<T: Send + 'static> Step6<T> {
    /// Schedules the request and returns without waiting for it.
    ///
    /// Only argument errors are returned here; everything that happens
    /// during execution goes to one of the callbacks.
    pub fn at(self, url: impl IntoUrl) -> Result<(), Error> {
        let request = self.request.with_url(url.into_url()?);
        self.machine
            .execute_async(request, self.run, self.on_success, self.on_failure)
    }
}

impl<T> fmt::Debug for Step6<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step6")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
