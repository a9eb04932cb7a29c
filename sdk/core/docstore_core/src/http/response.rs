// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::error::Result;
use crate::http::{Etag, Headers, StatusCode, ETAG};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::{fmt, marker::PhantomData};

/// A response as received from a [`Transport`](crate::http::Transport), with its body fully collected.
#[derive(Clone)]
pub struct RawResponse {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserializes the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn deconstruct(self) -> (StatusCode, Headers, Bytes) {
        (self.status, self.headers, self.body)
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

/// A successful service response.
///
/// The type parameter `T` is a marker for what the body is expected to deserialize into.
/// Call [`Response::into_body`] to deserialize it, or [`Response::into_raw`] to keep the bytes.
pub struct Response<T> {
    raw: RawResponse,
    phantom: PhantomData<fn() -> T>,
}

impl<T> Response<T> {
    pub fn new(raw: RawResponse) -> Self {
        Self {
            raw,
            phantom: PhantomData,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.raw.status
    }

    pub fn headers(&self) -> &Headers {
        &self.raw.headers
    }

    /// The `etag` header, if the service sent one.
    pub fn etag(&self) -> Option<Etag> {
        self.raw
            .headers
            .get_optional_str(&ETAG)
            .map(|value| Etag::from(value.to_string()))
    }

    pub fn into_raw(self) -> RawResponse {
        self.raw
    }

    /// Deserializes the body into a type other than the marker type.
    pub fn into_body_as<U: DeserializeOwned>(self) -> Result<U> {
        self.raw.json()
    }
}

impl<T: DeserializeOwned> Response<T> {
    /// Deserializes the body into `T`.
    pub fn into_body(self) -> Result<T> {
        self.raw.json()
    }
}

impl<T> fmt::Debug for Response<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.raw.status)
            .finish_non_exhaustive()
    }
}
