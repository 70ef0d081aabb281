//! # jsonstep - fluent JSON HTTP client
//!
//! A small, embeddable HTTP client for JSON APIs. A request is described one
//! step at a time, and each step only offers the operations that make sense at
//! that point: a `GET` never asks for a body, an asynchronous call cannot be
//! scheduled without a failure callback, and a typed call cannot decode into
//! "nothing".
//!
//! ## Features
//!
//! - **Step-by-step requests**: method, body, headers, query parameters, then
//!   a synchronous or asynchronous terminal call
//! - **Typed responses**: any `serde` type, `String`, or the raw [`Response`]
//! - **Pluggable capabilities**: transport, JSON codec and task executor are
//!   all traits, with HTTP/1.1-over-TCP, `serde_json` and inline execution as
//!   the defaults
//! - **Closed error set**: every failure is an [`Error`] with an
//!   [`ErrorKind`] of `Argument`, `Connection`, `Json`, `OperationFailed` or
//!   `NotOk`
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! jsonstep = "0.1.0"
//! ```
//!
//! ### Synchronous request
//!
//! ```rust,no_run
//! use jsonstep::Client;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct NewThing<'a> {
//!     name: &'a str,
//! }
//!
//! #[derive(Deserialize)]
//! struct Thing {
//!     id: u64,
//!     name: String,
//! }
//!
//! # fn main() -> Result<(), jsonstep::Error> {
//! let client = Client::new();
//!
//! let thing: Thing = client
//!     .go()
//!     .post()
//!     .body(&NewThing { name: "widget" })?
//!     .using_header("X-Request-Id", "42")?
//!     .expecting::<Thing>()?
//!     .at("http://localhost:8080/things")?;
//!
//! println!("created {} ({})", thing.name, thing.id);
//! # Ok(())
//! # }
//! ```
//!
//! ### Asynchronous request
//!
//! ```rust,no_run
//! use jsonstep::Client;
//!
//! # fn main() -> Result<(), jsonstep::Error> {
//! let client = Client::builder().enable_async_callbacks()?.build();
//!
//! client
//!     .go()
//!     .get()
//!     .on_success(|response| println!("got {}", response.body()))
//!     .on_failure(|error| eprintln!("failed: {}", error))
//!     .at("http://localhost:8080/things")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `defmt`: `defmt::Format` implementations for the error kinds

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

/// Byte-stream abstraction and the TCP connector.
///
/// The HTTP/1.1 transport is written against these traits, so any stream that
/// can read, write and close can carry requests.
pub mod network;

/// The request chain, its execution layers and the data model.
pub mod http;

pub use http::{
    Client, ClientBuilder, Error, ErrorKind, Fields, Method, Request, Response, StatusCode,
};
