use core::fmt;

/// http cookie.
///
/// request cookies only carry name and value. response cookies additionally carry the
/// attributes parsed from `Set-Cookie` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    max_age: i64,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    /// max age of session scoped cookie.
    pub const SESSION: i64 = -1;

    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            max_age: Self::SESSION,
            secure: false,
            http_only: false,
        }
    }

    /// cookie sent by client. every attribute other than name and value stays unset.
    pub fn request(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value)
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// max age in seconds. [Cookie::SESSION] for session scoped cookie.
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn get_domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn get_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn get_max_age(&self) -> i64 {
        self.max_age
    }

    pub fn is_session(&self) -> bool {
        self.max_age < 0
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    /// parse value of a `Set-Cookie` header. unknown attributes are ignored.
    pub fn parse_set_cookie(header: &str) -> Option<Self> {
        let mut parts = header.split(';');

        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self::new(name, value.trim().trim_matches('"'));

        for attr in parts {
            let (key, val) = match attr.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (attr.trim(), ""),
            };

            if key.eq_ignore_ascii_case("domain") {
                cookie.domain = Some(val.to_owned());
            } else if key.eq_ignore_ascii_case("path") {
                cookie.path = Some(val.to_owned());
            } else if key.eq_ignore_ascii_case("max-age") {
                if let Ok(age) = val.parse() {
                    cookie.max_age = age;
                }
            } else if key.eq_ignore_ascii_case("secure") {
                cookie.secure = true;
            } else if key.eq_ignore_ascii_case("httponly") {
                cookie.http_only = true;
            }
        }

        Some(cookie)
    }
}

/// `name=value` pair as written in `Cookie` request header.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}
