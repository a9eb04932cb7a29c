// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::error::Result;
use crate::http::{HeaderName, Headers, Method, CONTENT_TYPE};
use bytes::Bytes;
use serde::Serialize;
use url::Url;

/// An HTTP request.
///
/// Requests are cloned for every attempt so that each attempt can be signed independently.
#[derive(Clone, Debug)]
pub struct Request {
    url: Url,
    method: Method,
    headers: Headers,
    body: Bytes,
}

impl Request {
    pub fn new(url: Url, method: Method) -> Self {
        Self {
            url,
            method,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn insert_header(&mut self, name: impl Into<HeaderName>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Serializes `value` as the JSON body, setting `content-type` unless one is already present.
    pub fn set_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.body = serde_json::to_vec(value)?.into();
        if self.headers.get_optional_str(&CONTENT_TYPE).is_none() {
            self.headers.insert(CONTENT_TYPE, "application/json");
        }
        Ok(())
    }
}
