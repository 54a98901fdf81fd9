//! strongly typed library error.

use std::{convert::Infallible, error, fmt, io, time::Duration};

use super::http::{method, uri};

#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// response body grew past [RequestOptions::max_response_bytes] while truncation was disabled.
    ///
    /// [RequestOptions::max_response_bytes]: crate::RequestOptions::max_response_bytes
    CapacityExceeded(CapacityExceeded),
    /// wire level failure reported by [Transport](crate::transport::Transport).
    Transport(TransportError),
    /// blocking wait ran out of time. the exchange itself keeps running in background.
    WaitTimeout(Duration),
    /// exchange was abandoned by its transport before producing a terminal event.
    Interrupted,
    InvalidUri(InvalidUri),
    InvalidMethod(InvalidMethod),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded(e) => fmt::Display::fmt(e, f),
            Self::Transport(e) => fmt::Display::fmt(e, f),
            Self::WaitTimeout(dur) => write!(f, "response not complete after waiting {dur:?}"),
            Self::Interrupted => f.write_str("exchange abandoned before completion"),
            Self::InvalidUri(e) => fmt::Debug::fmt(e, f),
            Self::InvalidMethod(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Infallible> for Error {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<CapacityExceeded> for Error {
    fn from(e: CapacityExceeded) -> Self {
        Self::CapacityExceeded(e)
    }
}

/// response content reached the configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityExceeded {
    pub limit: usize,
}

impl fmt::Display for CapacityExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "response body exceeds capacity limit of {} bytes", self.limit)
    }
}

impl error::Error for CapacityExceeded {}

#[derive(Debug)]
pub enum InvalidUri {
    MissingHost,
    UnknownScheme,
    Other(uri::InvalidUri),
    Parts(uri::InvalidUriParts),
}

impl From<uri::InvalidUri> for InvalidUri {
    fn from(uri: uri::InvalidUri) -> Self {
        Self::Other(uri)
    }
}

impl From<uri::InvalidUri> for Error {
    fn from(e: uri::InvalidUri) -> Self {
        Self::InvalidUri(e.into())
    }
}

impl From<uri::InvalidUriParts> for Error {
    fn from(e: uri::InvalidUriParts) -> Self {
        Self::InvalidUri(InvalidUri::Parts(e))
    }
}

impl From<InvalidUri> for Error {
    fn from(e: InvalidUri) -> Self {
        Self::InvalidUri(e)
    }
}

/// method string is not one of the supported request methods.
#[derive(Debug)]
pub struct InvalidMethod(pub(crate) String);

impl fmt::Display for InvalidMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported request method: {}", self.0)
    }
}

impl error::Error for InvalidMethod {}

impl From<InvalidMethod> for Error {
    fn from(e: InvalidMethod) -> Self {
        Self::InvalidMethod(e)
    }
}

impl From<method::InvalidMethod> for Error {
    fn from(_: method::InvalidMethod) -> Self {
        Self::InvalidMethod(InvalidMethod(String::from("<invalid token>")))
    }
}

/// failure surfaced by a [Transport](crate::transport::Transport) while driving an exchange.
#[derive(Debug)]
#[non_exhaustive]
pub enum TransportError {
    Io(io::Error),
    Timeout(TimeoutError),
    Proto(ProtoError),
    /// request can not be carried by the transport. (tls, unknown scheme, etc)
    Unsupported(&'static str),
    /// transport is shut down and does not accept new exchanges.
    Shutdown,
    Std(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => fmt::Display::fmt(e, f),
            Self::Timeout(e) => fmt::Display::fmt(e, f),
            Self::Proto(e) => fmt::Display::fmt(e, f),
            Self::Unsupported(msg) => write!(f, "unsupported by transport: {msg}"),
            Self::Shutdown => f.write_str("transport is shut down"),
            Self::Std(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl error::Error for TransportError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Std(e) => Some(&**e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<TimeoutError> for TransportError {
    fn from(e: TimeoutError) -> Self {
        Self::Timeout(e)
    }
}

impl From<ProtoError> for TransportError {
    fn from(e: ProtoError) -> Self {
        Self::Proto(e)
    }
}

impl From<Box<dyn error::Error + Send + Sync>> for TransportError {
    fn from(e: Box<dyn error::Error + Send + Sync>) -> Self {
        Self::Std(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutError {
    Connect,
    Request,
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("socket connect timeout"),
            Self::Request => f.write_str("request exchange timeout"),
        }
    }
}

impl error::Error for TimeoutError {}

/// malformed or unexpected data on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoError {
    InvalidHeader,
    UnexpectedEof,
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeader => f.write_str("invalid header"),
            Self::UnexpectedEof => f.write_str("connection closed before response is complete"),
        }
    }
}

impl error::Error for ProtoError {}
