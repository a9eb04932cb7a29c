// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::error::{Error, ErrorKind, Result};
use crate::http::{Headers, Method, RawResponse, Request, StatusCode, Transport};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A [`Transport`] backed by a pooled [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: ::reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport whose requests time out after `timeout`, if given.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = ::reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|error| {
            Error::full(
                ErrorKind::Configuration,
                error,
                "failed to build the HTTP client",
            )
        })?;
        Ok(Self { client })
    }

    pub fn from_client(client: ::reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: Method) -> ::reqwest::Method {
    match method {
        Method::Get => ::reqwest::Method::GET,
        Method::Post => ::reqwest::Method::POST,
        Method::Put => ::reqwest::Method::PUT,
        Method::Delete => ::reqwest::Method::DELETE,
    }
}

fn map_transport_error(error: ::reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::full(ErrorKind::NetworkTimeout, error, "request timed out")
    } else if error.is_builder() {
        Error::full(ErrorKind::InvalidArgument, error, "request could not be built")
    } else {
        Error::full(
            ErrorKind::ServiceUnavailable,
            error,
            "failed to reach the service",
        )
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &Request) -> Result<RawResponse> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method()), request.url().clone());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name.as_str(), value);
        }
        if !request.body().is_empty() {
            builder = builder.body(request.body().clone());
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = StatusCode::new(response.status().as_u16());
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_owned(), value);
            }
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(%status, body_len = body.len(), "received response");

        Ok(RawResponse::new(status, headers, body))
    }
}
