use core::fmt;

use std::{collections::BTreeMap, io, sync::Arc};

use bytes::Bytes;

use super::{
    attribute::{Attribute, Attributes, TRUNCATED},
    cookie::Cookie,
    named::{self, Header, IntoValue},
    stats::Stats,
    timing::Timing,
};

/// common response status codes.
pub mod code {
    pub const OK: u16 = 200;
    pub const ACCEPTED: u16 = 202;
    pub const NO_CONTENT: u16 = 204;
    pub const BAD_REQUEST: u16 = 400;
    pub const UNAUTHORIZED: u16 = 401;
    pub const FORBIDDEN: u16 = 403;
    pub const NOT_FOUND: u16 = 404;
    pub const SERVER_ERROR: u16 = 500;
    pub const SERVER_UNAVAILABLE: u16 = 503;

    /// status code in 2xx range.
    pub const fn is_ok(code: u16) -> bool {
        code >= 200 && code < 300
    }
}

/// deferred source of response content. content is produced when read.
pub trait ByteSource: Send + Sync {
    fn read(&self) -> io::Result<Bytes>;
}

impl<F> ByteSource for F
where
    F: Fn() -> io::Result<Bytes> + Send + Sync,
{
    fn read(&self) -> io::Result<Bytes> {
        self()
    }
}

/// response body.
#[derive(Clone, Default)]
pub enum Body {
    #[default]
    None,
    /// content fully held in memory.
    Buffered(Bytes),
    /// content read on demand from a [ByteSource].
    Streamed(Arc<dyn ByteSource>),
}

impl Body {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn is_streamed(&self) -> bool {
        matches!(self, Self::Streamed(_))
    }

    /// buffered content. `None` for absent and streamed body.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Buffered(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// content of body. streamed body reads from its source.
    pub fn read(&self) -> io::Result<Option<Bytes>> {
        match self {
            Self::None => Ok(None),
            Self::Buffered(bytes) => Ok(Some(bytes.clone())),
            Self::Streamed(source) => source.read().map(Some),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("Body::None"),
            Self::Buffered(bytes) => write!(f, "Body::Buffered({} bytes)", bytes.len()),
            Self::Streamed(_) => f.write_str("Body::Streamed"),
        }
    }
}

/// immutable http response.
#[derive(Clone, Debug)]
pub struct Response {
    status: u16,
    headers: Arc<BTreeMap<String, Header>>,
    attributes: Arc<Attributes>,
    cookies: Arc<[Cookie]>,
    body: Body,
    timing: Option<Timing>,
    stats: Option<Stats>,
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        code::is_ok(self.status)
    }

    pub fn headers(&self) -> impl Iterator<Item = &Header> {
        self.headers.values()
    }

    /// header by name. names are matched case insensitively.
    pub fn header(&self, name: &str) -> Option<&Header> {
        named::lookup(&self.headers, name)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.header(name).map(Header::value)
    }

    pub fn header_values(&self, name: &str) -> &[String] {
        self.header(name).map(Header::values).unwrap_or_default()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_value(Header::CONTENT_TYPE)
    }

    pub fn charset<'a>(&'a self, default: &'a str) -> &'a str {
        named::charset(self.content_type(), default)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// body was cut at the capacity limit of the exchange.
    pub fn is_truncated(&self) -> bool {
        self.attribute(TRUNCATED).and_then(Attribute::as_bool).unwrap_or(false)
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// buffered body content.
    pub fn bytes(&self) -> Option<&Bytes> {
        self.body.as_bytes()
    }

    pub fn timing(&self) -> Option<&Timing> {
        self.timing.as_ref()
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: {}", self.status)?;
        for h in self.headers.values() {
            writeln!(f, "{h}")?;
        }
        for (name, value) in self.attributes.iter() {
            writeln!(f, "@{name}: {value}")?;
        }
        if let Some(bytes) = self.body.as_bytes() {
            writeln!(f)?;
            f.write_str(&String::from_utf8_lossy(bytes))?;
        }
        Ok(())
    }
}

/// builder type for [Response].
#[derive(Clone, Default)]
pub struct ResponseBuilder {
    status: u16,
    headers: BTreeMap<String, Header>,
    attributes: Attributes,
    cookies: Vec<Cookie>,
    body: Option<Bytes>,
    source: Option<Arc<dyn ByteSource>>,
    timing: Option<Timing>,
    stats: Option<Stats>,
}

impl ResponseBuilder {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// deferred body source. it's not read by the builder.
    pub fn body_source(&mut self, source: impl ByteSource + 'static) -> &mut Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// append a header value. headers are keyed by lower case name.
    pub fn header(&mut self, name: impl Into<String>, value: impl IntoValue) -> &mut Self {
        let name = name.into();
        let key = named::key(&name);
        let header = match self.headers.remove(&key) {
            Some(h) => h.add_value(value),
            None => Header::new(name, value),
        };
        self.headers.insert(key, header);
        self
    }

    /// insert headers. existing headers with the same name are replaced.
    pub fn headers<I>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = Header>,
    {
        for h in headers {
            self.headers.insert(named::key(h.name()), h);
        }
        self
    }

    pub fn attribute(&mut self, name: impl Into<String>, value: impl Into<Attribute>) -> &mut Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn cookie(&mut self, cookie: Cookie) -> &mut Self {
        self.cookies.push(cookie);
        self
    }

    pub fn timing(&mut self, timing: Timing) -> &mut Self {
        self.timing = Some(timing);
        self
    }

    /// attach stats. timing of the stats is attached as well.
    pub fn stats(&mut self, stats: Stats) -> &mut Self {
        self.timing = Some(*stats.timing());
        self.stats = Some(stats);
        self
    }

    /// response with buffered body or no body when none is set.
    pub fn create(&self) -> Response {
        let body = match self.body {
            Some(ref bytes) => Body::Buffered(bytes.clone()),
            None => Body::None,
        };
        self.finish(body)
    }

    /// response backed by the deferred body source. no body when no source is set.
    pub fn create_streamed(&self) -> Response {
        let body = match self.source {
            Some(ref source) => Body::Streamed(source.clone()),
            None => Body::None,
        };
        self.finish(body)
    }

    fn finish(&self, body: Body) -> Response {
        Response {
            status: self.status,
            headers: Arc::new(self.headers.clone()),
            attributes: Arc::new(self.attributes.clone()),
            cookies: self.cookies.iter().cloned().collect(),
            body,
            timing: self.timing,
            stats: self.stats,
        }
    }
}
