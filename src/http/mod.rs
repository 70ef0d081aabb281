//! A fluent JSON-over-HTTP client
//!
//! Requests are described step by step starting from [`Client::go`]. Each step
//! holds an immutable [`Request`] and hands a refined copy to the next step,
//! until the chain ends in a synchronous `at(url)` or an asynchronous
//! `on_success(..).on_failure(..).at(url)`.
//!
//! Execution is layered:
//!
//! - [`StepMachine`] validates requests, checks the status family and decodes
//!   typed results; asynchronous work goes through an [`Executor`].
//! - [`RequestExecutor`] performs one round trip and classifies failures.
//! - [`ConnectionPreparer`] opens a [`Handle`] from the configured
//!   [`Transport`] and applies method, headers and output mode.
//! - [`Http1Transport`] speaks HTTP/1.1 over any
//!   [`network::Connect`](crate::network::Connect).
//!

#![allow(missing_docs)]

pub mod client;
pub mod codec;
pub mod error;
pub mod executor;
pub mod fields;
pub mod h1;
pub mod machine;
pub mod preparer;
pub mod request;
pub mod request_executor;
pub mod response;
pub mod status;
pub mod steps;
pub mod transport;

pub use client::{Client, ClientBuilder, DEFAULT_TIMEOUT};
pub use codec::{JsonCodec, SerdeJsonCodec};
pub use error::{Error, ErrorKind};
pub use executor::{Executor, InlineExecutor, Task, ThreadExecutor};
pub use fields::Fields;
pub use h1::Http1Transport;
pub use machine::{OnFailure, OnSuccess, StepMachine};
pub use preparer::ConnectionPreparer;
pub use request::{IntoUrl, Method, Request, RequestBuilder};
pub use request_executor::RequestExecutor;
pub use response::{Response, ResponseBuilder};
pub use status::StatusCode;
pub use steps::{MethodStep, Step1, Step2, Step3, Step4, Step5, Step6};
pub use transport::{Handle, Transport};
