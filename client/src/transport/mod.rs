//! wire level seam of the client.
//!
//! A [Transport] drives one exchange per [Transport::send] call and reports its progress as
//! events on a [Listener]. The event order of a successful exchange is:
//!
//! ```text
//! on_queued
//! on_request_begin -> on_request_headers -> on_request_commit -> on_request_content* -> on_request_success
//! on_response_begin -> on_response_header* -> on_response_headers -> on_response_content* -> on_response_success
//! on_complete
//! ```
//!
//! A failed exchange replaces the success event of the side it failed on with the matching failure
//! event. [Listener::on_complete] is always the last event and is delivered exactly once. A
//! transport that drops its listener without calling it leaves the exchange interrupted.

#[cfg(feature = "http1")]
pub mod h1;
pub mod scripted;

use core::fmt;

use std::{error, sync::Arc};

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::{error::TransportError, options::RequestOptions, request::Request};

/// reason a [Listener] asks its transport to stop delivering response events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Abort {
    /// response content does not fit the collection buffer.
    CapacityReached { limit: usize },
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityReached { limit } => write!(f, "buffering capacity {limit} exceeded"),
        }
    }
}

impl error::Error for Abort {}

/// failed outcome of an exchange.
#[derive(Debug)]
pub enum Failure {
    /// exchange stopped because a listener aborted it.
    Aborted(Abort),
    Transport(TransportError),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted(a) => fmt::Display::fmt(a, f),
            Self::Transport(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl error::Error for Failure {}

impl From<Abort> for Failure {
    fn from(a: Abort) -> Self {
        Self::Aborted(a)
    }
}

impl From<TransportError> for Failure {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

macro_rules! from_transport_error {
    ($($ty: ty),*) => {
        $(
            impl From<$ty> for Failure {
                fn from(e: $ty) -> Self {
                    Self::Transport(TransportError::from(e))
                }
            }
        )*
    };
}

from_transport_error!(std::io::Error, crate::error::TimeoutError, crate::error::ProtoError);

/// receiver of exchange events.
///
/// events of one exchange may arrive on any thread but never concurrently with each other.
#[allow(unused_variables)]
pub trait Listener: Send + Sync {
    fn on_queued(&self) {}

    fn on_request_begin(&self) {}

    fn on_request_headers(&self, headers: &HeaderMap) {}

    fn on_request_commit(&self) {}

    fn on_request_content(&self, chunk: &[u8]) {}

    fn on_request_success(&self) {}

    fn on_request_failure(&self, err: &Failure) {}

    fn on_response_begin(&self, status: StatusCode) {}

    fn on_response_header(&self, name: &HeaderName, value: &HeaderValue) {}

    /// all response headers are received. returning [Abort] ends the exchange.
    fn on_response_headers(&self, head: &http::Response<()>) -> Result<(), Abort> {
        Ok(())
    }

    /// a chunk of response content is received. returning [Abort] ends the exchange.
    fn on_response_content(&self, chunk: &[u8]) -> Result<(), Abort> {
        Ok(())
    }

    fn on_response_success(&self) {}

    fn on_response_failure(&self, err: &Failure) {}

    /// terminal event of the exchange.
    fn on_complete(&self, result: Result<(), Failure>);
}

/// wire level engine executing exchanges.
pub trait Transport: Send + Sync {
    /// start an exchange. must not block on network io.
    ///
    /// implementor must call [Listener::on_queued] before any other event.
    fn send(&self, req: Request, opts: &RequestOptions, listener: Arc<dyn Listener>);

    /// stop accepting new exchanges and release resources.
    fn shutdown(&self) {}
}

impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    fn send(&self, req: Request, opts: &RequestOptions, listener: Arc<dyn Listener>) {
        (**self).send(req, opts, listener)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}

impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    fn send(&self, req: Request, opts: &RequestOptions, listener: Arc<dyn Listener>) {
        (**self).send(req, opts, listener)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}
