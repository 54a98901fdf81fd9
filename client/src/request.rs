use core::{fmt, str::FromStr};

use std::{collections::BTreeMap, sync::Arc};

use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use super::{
    attribute::{Attribute, Attributes, REMOTE_ADDR},
    cookie::Cookie,
    error::{Error, InvalidMethod, InvalidUri},
    http::{self, Uri},
    named::{self, Header, IntoValue, Parameter},
};

/// content type of url encoded form body.
pub const FORM_ENCODED_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// application/x-www-form-urlencoded leaves `*-._` untouched and writes space as `+`.
const FORM: &AsciiSet = &NON_ALPHANUMERIC.remove(b'*').remove(b'-').remove(b'.').remove(b'_').remove(b' ');

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
        }
    }

    /// method expecting a request body.
    pub const fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl FromStr for Method {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Get,
            Self::Head,
            Self::Post,
            Self::Put,
            Self::Delete,
            Self::Patch,
            Self::Options,
        ]
        .into_iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| InvalidMethod(s.to_owned()))
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Head => Self::HEAD,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
            Method::Patch => Self::PATCH,
            Method::Options => Self::OPTIONS,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// parse a query string into parameters.
///
/// a leading `?` or `&` is tolerated. repeated names append values in order. when `case_sensitive`
/// is false parameters are keyed by lower case name.
pub fn parse_parameters(query: &str, case_sensitive: bool) -> BTreeMap<String, Parameter> {
    let mut params = BTreeMap::new();

    let query = query.trim_start_matches(['?', '&']);

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = decode(name);
        if name.is_empty() {
            continue;
        }
        append_parameter(&mut params, name, decode(value), case_sensitive);
    }

    params
}

fn append_parameter(params: &mut BTreeMap<String, Parameter>, name: String, value: String, case_sensitive: bool) {
    let key = if case_sensitive { name.clone() } else { named::key(&name) };
    let param = match params.remove(&key) {
        Some(p) => p.add_value(value),
        None => Parameter::new(name, value),
    };
    params.insert(key, param);
}

fn decode(s: &str) -> String {
    let s = s.replace('+', " ");
    percent_decode_str(&s).decode_utf8_lossy().into_owned()
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, FORM).to_string().replace(' ', "+")
}

/// immutable http request.
///
/// cloning is cheap. header, parameter, attribute and cookie collections are shared.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: Arc<BTreeMap<String, Header>>,
    parameters: Arc<BTreeMap<String, Parameter>>,
    body: Option<Bytes>,
    attributes: Arc<Attributes>,
    cookies: Arc<[Cookie]>,
}

impl Request {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// raw query string without leading `?`.
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// path of request uri. always starts with `/`.
    pub fn request_path(&self) -> &str {
        match self.uri.path() {
            "" => "/",
            path => path,
        }
    }

    /// non empty, trimmed components of request path.
    pub fn path_components(&self) -> Vec<&str> {
        self.request_path()
            .split('/')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// scheme and authority of request uri. never ends with `/`.
    pub fn host_url(&self) -> String {
        let mut url = String::new();
        if let Some(scheme) = self.uri.scheme_str() {
            url.push_str(scheme);
            url.push_str("://");
        }
        if let Some(authority) = self.uri.authority() {
            url.push_str(authority.as_str());
        }
        url
    }

    /// host name without port from `Host` header. falls back to host of request uri.
    pub fn server_name(&self) -> Option<&str> {
        match self.header_value("Host").filter(|h| !h.is_empty()) {
            Some(host) => host.split(':').next(),
            None => self.uri.host(),
        }
    }

    pub fn headers(&self) -> impl Iterator<Item = &Header> {
        self.headers.values()
    }

    /// header by name. exact name is tried first, then lower case.
    pub fn header(&self, name: &str) -> Option<&Header> {
        named::lookup(&self.headers, name)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.header(name).map(Header::value)
    }

    pub fn header_values(&self, name: &str) -> &[String] {
        self.header(name).map(Header::values).unwrap_or_default()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        named::lookup(&self.parameters, name)
    }

    pub fn parameter_value(&self, name: &str) -> Option<&str> {
        self.parameter(name).map(Parameter::value)
    }

    pub fn parameter_values(&self, name: &str) -> &[String] {
        self.parameter(name).map(Parameter::values).unwrap_or_default()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_value(Header::CONTENT_TYPE)
    }

    pub fn charset<'a>(&'a self, default: &'a str) -> &'a str {
        named::charset(self.content_type(), default)
    }

    /// POST with parameters or explicit url encoded form content type.
    pub fn is_form_encoded(&self) -> bool {
        if self.method == Method::Post && !self.parameters.is_empty() {
            return true;
        }
        self.content_type()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with(FORM_ENCODED_CONTENT_TYPE))
            .unwrap_or(false)
    }

    pub fn remote_addr(&self) -> Option<&str> {
        self.attribute(REMOTE_ADDR).and_then(Attribute::as_str)
    }

    /// url encoded body of a POST request with parameters.
    pub fn form_body(&self) -> Option<Bytes> {
        if self.method != Method::Post || self.parameters.is_empty() {
            return None;
        }

        let mut body = String::new();
        for param in self.parameters.values() {
            let name = encode(param.name());
            // a parameter without values is still submitted as an empty field.
            if param.values().is_empty() {
                push_pair(&mut body, &name, "");
            }
            for value in param.values() {
                push_pair(&mut body, &name, &encode(value));
            }
        }

        Some(Bytes::from(body))
    }

    /// a copy of request with given headers added. existing headers with the same name are
    /// replaced. self is left untouched.
    pub fn add_headers<I>(&self, headers: I) -> Self
    where
        I: IntoIterator<Item = Header>,
    {
        let mut map = (*self.headers).clone();
        for h in headers {
            map.insert(named::key(h.name()), h);
        }
        Self {
            headers: Arc::new(map),
            ..self.clone()
        }
    }
}

fn push_pair(buf: &mut String, name: &str, value: &str) {
    if !buf.is_empty() {
        buf.push('&');
    }
    buf.push_str(name);
    buf.push('=');
    buf.push_str(value);
}

/// builder type for [Request].
///
/// builder is reusable. every call to [RequestBuilder::create] produces an independent request
/// and later mutation of the builder does not affect requests already created.
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    headers: BTreeMap<String, Header>,
    parameters: BTreeMap<String, Parameter>,
    case_sensitive_parameters: bool,
    body: Option<Bytes>,
    attributes: Attributes,
    cookies: Vec<Cookie>,
}

macro_rules! method {
    ($method: tt, $variant: ident) => {
        #[doc = concat!("start a [RequestBuilder] with ", stringify!($variant), " method.")]
        pub fn $method<U>(uri: U) -> Result<Self, Error>
        where
            Uri: TryFrom<U>,
            Error: From<<Uri as TryFrom<U>>::Error>,
        {
            Self::new(Method::$variant, uri)
        }
    };
    ($method: tt, $variant: ident, body) => {
        #[doc = concat!("start a [RequestBuilder] with ", stringify!($variant), " method and request body.")]
        pub fn $method<U>(uri: U, body: impl Into<Bytes>) -> Result<Self, Error>
        where
            Uri: TryFrom<U>,
            Error: From<<Uri as TryFrom<U>>::Error>,
        {
            let mut builder = Self::new(Method::$variant, uri)?;
            builder.body(body);
            Ok(builder)
        }
    };
}

impl RequestBuilder {
    /// start a builder with given method and uri. query parameters of uri are parsed into
    /// builder parameters.
    pub fn new<U>(method: Method, uri: U) -> Result<Self, Error>
    where
        Uri: TryFrom<U>,
        Error: From<<Uri as TryFrom<U>>::Error>,
    {
        let uri = Uri::try_from(uri)?;

        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            Some(_) => return Err(InvalidUri::UnknownScheme.into()),
            None => {}
        }

        if uri.host().is_none() {
            return Err(InvalidUri::MissingHost.into());
        }

        let parameters = uri.query().map(|q| parse_parameters(q, false)).unwrap_or_default();

        Ok(Self {
            method,
            uri,
            headers: BTreeMap::new(),
            parameters,
            case_sensitive_parameters: false,
            body: None,
            attributes: Attributes::new(),
            cookies: Vec::new(),
        })
    }

    method!(get, Get);
    method!(head, Head);
    method!(delete, Delete);
    method!(options, Options);
    method!(post, Post, body);
    method!(put, Put, body);
    method!(patch, Patch, body);

    /// start a url encoded form POST. parameters are sent as request body.
    pub fn form_post<U>(uri: U) -> Result<Self, Error>
    where
        Uri: TryFrom<U>,
        Error: From<<Uri as TryFrom<U>>::Error>,
    {
        let mut builder = Self::new(Method::Post, uri)?;
        builder.header(Header::CONTENT_TYPE, FORM_ENCODED_CONTENT_TYPE);
        Ok(builder)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// append a header value. names are matched case insensitively.
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

    /// key parameters by their exact name instead of lower case.
    pub fn case_sensitive_parameters(&mut self, case_sensitive: bool) -> &mut Self {
        self.case_sensitive_parameters = case_sensitive;
        self
    }

    /// append a parameter value.
    pub fn parameter(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        append_parameter(
            &mut self.parameters,
            name.into(),
            value.into(),
            self.case_sensitive_parameters,
        );
        self
    }

    /// replace all values of a parameter.
    pub fn set_parameter<I>(&mut self, name: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: IntoValue,
    {
        let name = name.into();
        let key = if self.case_sensitive_parameters {
            name.clone()
        } else {
            named::key(&name)
        };
        self.parameters.insert(key, Parameter::with_values(name, values));
        self
    }

    pub fn parameters<I, K, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in params {
            self.parameter(name, value);
        }
        self
    }

    pub fn body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    pub fn attribute(&mut self, name: impl Into<String>, value: impl Into<Attribute>) -> &mut Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attributes<I, K, V>(&mut self, attributes: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Attribute>,
    {
        self.attributes
            .extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn cookie(&mut self, cookie: Cookie) -> &mut Self {
        self.cookies.push(cookie);
        self
    }

    /// produce an immutable request from current state of builder.
    pub fn create(&self) -> Request {
        Request {
            method: self.method,
            uri: self.uri.clone(),
            headers: Arc::new(self.headers.clone()),
            parameters: Arc::new(self.parameters.clone()),
            body: self.body.clone(),
            attributes: Arc::new(self.attributes.clone()),
            cookies: self.cookies.iter().cloned().collect(),
        }
    }
}
