// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::error::Result;
use crate::http::{RawResponse, Request};
use async_trait::async_trait;
use std::fmt::Debug;

/// Sends a single request and collects its response.
///
/// A transport returns `Ok` for every response it receives, successful or not; status
/// classification and retries happen above it. It returns `Err` only when no response was
/// obtained, using [`ErrorKind::NetworkTimeout`](crate::ErrorKind::NetworkTimeout) for timeouts
/// and [`ErrorKind::ServiceUnavailable`](crate::ErrorKind::ServiceUnavailable) for other
/// connection failures.
///
/// Implementations must be safe to share between concurrently running operations.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn send(&self, request: &Request) -> Result<RawResponse>;
}
