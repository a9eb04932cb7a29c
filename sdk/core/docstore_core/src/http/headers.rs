// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::error::{Error, ErrorKind, Result};
use std::{borrow::Cow, collections::HashMap, fmt, str::FromStr, time::Duration};

/// A case-insensitive header name, stored lower-cased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeaderName(Cow<'static, str>);

impl HeaderName {
    /// Creates a header name from a static, already lower-cased string.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for HeaderName {
    fn from(name: &'static str) -> Self {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            Self(Cow::Owned(name.to_ascii_lowercase()))
        } else {
            Self(Cow::Borrowed(name))
        }
    }
}

impl From<String> for HeaderName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name.to_ascii_lowercase()))
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const AUTHORIZATION: HeaderName = HeaderName::from_static("authorization");
pub const CONTENT_TYPE: HeaderName = HeaderName::from_static("content-type");
pub const ETAG: HeaderName = HeaderName::from_static("etag");
pub const IF_MATCH: HeaderName = HeaderName::from_static("if-match");
pub const RETRY_AFTER: HeaderName = HeaderName::from_static("retry-after");

/// A collection of HTTP headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(HashMap<HeaderName, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, replacing any existing value.
    pub fn insert(&mut self, name: impl Into<HeaderName>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &HeaderName) -> Option<String> {
        self.0.remove(name)
    }

    pub fn get_optional_str(&self, name: &HeaderName) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Gets a header value, failing with [`ErrorKind::DataConversion`] if it is missing.
    pub fn get_str(&self, name: &HeaderName) -> Result<&str> {
        self.get_optional_str(name).ok_or_else(|| {
            Error::message(
                ErrorKind::DataConversion,
                format!("header '{name}' is missing"),
            )
        })
    }

    /// Gets and parses a header value, if present.
    pub fn get_optional_as<T>(&self, name: &HeaderName) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.get_optional_str(name)
            .map(|value| {
                value.trim().parse::<T>().map_err(|error| {
                    Error::full(
                        ErrorKind::DataConversion,
                        error,
                        format!("header '{name}' has an invalid value"),
                    )
                })
            })
            .transpose()
    }

    /// Reads a retry delay expressed in milliseconds.
    pub fn get_retry_after_ms(&self, name: &HeaderName) -> Option<Duration> {
        self.get_optional_as::<u64>(name)
            .ok()
            .flatten()
            .map(Duration::from_millis)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &str)> {
        self.0.iter().map(|(name, value)| (name, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("X-Ms-Max-Item-Count", "10");
        assert_eq!(
            headers.get_optional_str(&HeaderName::from_static("x-ms-max-item-count")),
            Some("10")
        );
    }

    #[test]
    fn missing_header_is_a_conversion_error() {
        let headers = Headers::new();
        let error = headers.get_str(&ETAG).unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::DataConversion);
    }

    #[test]
    fn parses_retry_after_milliseconds() {
        let name = HeaderName::from_static("x-ms-retry-after-ms");
        let mut headers = Headers::new();
        headers.insert(name.clone(), "250");
        assert_eq!(
            headers.get_retry_after_ms(&name),
            Some(Duration::from_millis(250))
        );

        headers.insert(name.clone(), "soon");
        assert_eq!(headers.get_retry_after_ms(&name), None);
    }
}
