use core::fmt;

use std::collections::BTreeMap;

/// attribute key flagging a response whose body was cut at the capacity limit.
pub const TRUNCATED: &str = "truncated";

/// attribute key carrying the remote address of a request.
pub const REMOTE_ADDR: &str = "remoteAddr";

/// string keyed attribute bag of requests and responses.
pub type Attributes = BTreeMap<String, Attribute>;

/// loosely typed attribute value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attribute {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Attribute {
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Attribute {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Attribute {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for Attribute {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Attribute {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => fmt::Display::fmt(b, f),
            Self::Int(i) => fmt::Display::fmt(i, f),
            Self::Text(s) => f.write_str(s),
        }
    }
}
