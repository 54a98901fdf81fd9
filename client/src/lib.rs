//! an http client abstraction with capacity bounded, instrumented response collection.
//!
//! # Quick Start
//! ```no_run
//! use tally_client::{error::Error, Client, HttpClient, RequestBuilder, RequestOptions};
//!
//! fn main() -> Result<(), Error> {
//!     // build client with the default http/1 transport.
//!     let client = HttpClient::builder().finish()?;
//!     // build an immutable request.
//!     let req = RequestBuilder::get("http://example.com/")?.create();
//!     // send it and block until the response is collected. bodies over 64KiB are truncated.
//!     let opts = RequestOptions::DEFAULT.max_response_bytes(64 * 1024).truncate_on_limit();
//!     let res = client.send(req, &opts)?;
//!     println!("{} truncated: {}", res.status_code(), res.is_truncated());
//!     // timing and size statistics of the exchange.
//!     if let Some(stats) = res.stats() {
//!         println!("{stats}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Consumption styles
//! Every exchange ends in a single terminal event. [Client] exposes it three ways:
//! - [Client::send] blocks the calling thread with a timeout.
//! - [Client::send_async] returns a [ListenableResponse] accepting one completion callback.
//! - [Client::send_promise] returns a [ResponseFuture] that can be awaited or polled.
//!
//! # Transports
//! The wire level engine is abstracted by [transport::Transport]. The default `http1` feature
//! drives exchanges with `xitca-client`. See [ClientBuilder::transport] for plugging a custom one.

#![forbid(unsafe_code)]

mod attribute;
mod builder;
mod client;
mod collector;
mod completion;
mod cookie;
mod exchange;
mod named;
mod options;
mod recorder;
mod request;
mod response;
mod stats;
mod timing;

pub mod auth;
pub mod error;
pub mod transport;

pub use self::attribute::{Attribute, Attributes, REMOTE_ADDR, TRUNCATED};
pub use self::builder::ClientBuilder;
pub use self::client::{Client, HttpClient};
pub use self::collector::{Collector, Overflow};
pub use self::completion::{Listenable, ListenableResponse, Pending, Promise, ResponseFuture};
pub use self::cookie::Cookie;
pub use self::named::{Header, IntoValue, Parameter};
pub use self::options::{ClientOptions, ClientOptionsBuilder, Instrument, RequestOptions};
pub use self::recorder::Recorder;
pub use self::request::{Method, Request, RequestBuilder, parse_parameters};
pub use self::response::{Body, ByteSource, Response, ResponseBuilder, code};
pub use self::stats::Stats;
pub use self::timing::Timing;

// re-export http crate.
pub use http;

// re-export bytes crate.
pub use bytes;
