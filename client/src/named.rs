//! multi valued named types carried by requests and responses.

use core::fmt;

use std::sync::Arc;

/// value accepted by [Header] and [Parameter] constructors.
/// `None` and empty strings are absent values and are dropped on construction.
pub trait IntoValue {
    fn into_value(self) -> Option<String>;
}

impl IntoValue for String {
    fn into_value(self) -> Option<String> {
        Some(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Option<String> {
        Some(self.to_owned())
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Option<String> {
        Some(self.clone())
    }
}

impl<V: IntoValue> IntoValue for Option<V> {
    fn into_value(self) -> Option<String> {
        self.and_then(IntoValue::into_value)
    }
}

fn collect_values<I>(values: I) -> Arc<[String]>
where
    I: IntoIterator,
    I::Item: IntoValue,
{
    values
        .into_iter()
        .filter_map(IntoValue::into_value)
        .filter(|v| !v.is_empty())
        .collect()
}

macro_rules! named {
    ($(#[$meta: meta])* $ty: ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $ty {
            name: String,
            values: Arc<[String]>,
        }

        impl $ty {
            /// construct with a single value. an empty value leaves the value list empty.
            pub fn new(name: impl Into<String>, value: impl IntoValue) -> Self {
                Self::with_values(name, [value])
            }

            /// construct with multiple values. empty and absent values are dropped.
            pub fn with_values<I>(name: impl Into<String>, values: I) -> Self
            where
                I: IntoIterator,
                I::Item: IntoValue,
            {
                Self {
                    name: name.into(),
                    values: collect_values(values),
                }
            }

            pub fn name(&self) -> &str {
                &self.name
            }

            /// first value or empty string when there is none.
            pub fn value(&self) -> &str {
                self.values.first().map(String::as_str).unwrap_or("")
            }

            pub fn values(&self) -> &[String] {
                &self.values
            }

            /// a new instance with given value appended. self is left untouched.
            pub fn add_value(&self, value: impl IntoValue) -> Self {
                let values = self
                    .values
                    .iter()
                    .cloned()
                    .chain(value.into_value())
                    .filter(|v| !v.is_empty())
                    .collect();
                Self {
                    name: self.name.clone(),
                    values,
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}: {}", self.name, self.values.join(", "))
            }
        }
    };
}

named!(
    /// http header with its ordered values.
    Header
);

impl Header {
    pub const CONTENT_TYPE: &'static str = "Content-Type";
}

/// charset named by a content type header value or given default when absent.
pub(crate) fn charset<'a>(content_type: Option<&'a str>, default: &'a str) -> &'a str {
    content_type
        .and_then(|ct| ct.find("charset=").map(|idx| ct[idx + 8..].trim()))
        .filter(|cs| !cs.is_empty())
        .unwrap_or(default)
}

/// map key of a case insensitive name. every map keyed by names goes through it.
pub(crate) fn key(name: &str) -> String {
    name.to_lowercase()
}

/// case insensitive lookup over maps keyed by [key]. exact key is tried first.
pub(crate) fn lookup<'m, T>(map: &'m std::collections::BTreeMap<String, T>, name: &str) -> Option<&'m T> {
    map.get(name).or_else(|| map.get(&key(name)))
}

named!(
    /// query or form parameter with its ordered values.
    Parameter
);
