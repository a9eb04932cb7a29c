// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Retry with capped exponential backoff.
//!
//! Each operation moves through `Sending -> AwaitingResponse` and then ends in `Success`,
//! `DefinitiveFailure`, or a `TransientFailure` that leads to a `BackoffWait` and another send.
//! Once the attempt budget is spent the last transient failure is reported as
//! [`ErrorKind::RetriesExhausted`]. If the operation's [`Context`] carries a stop token the
//! whole loop, including any backoff wait, is abandoned as soon as the token fires.

use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use futures::FutureExt as _;
use std::{future::Future, time::Duration};
use stop_token::prelude::*;
use tracing::{debug, warn};

/// Bounds for the retry loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryOptions {
    /// Total attempts, including the first one. Values below one are treated as one.
    pub max_attempts: u32,

    /// Delay before the first retry; it doubles on every further retry.
    pub initial_delay: Duration,

    /// Upper bound for any single delay, including server-suggested ones.
    pub max_delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryOptions {
    /// Options that never retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RetryPolicy {
    options: RetryOptions,
}

impl RetryPolicy {
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    pub fn max_attempts(&self) -> u32 {
        self.options.max_attempts.max(1)
    }

    /// The un-jittered delay that follows failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.options
            .initial_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.options.max_delay)
            .min(self.options.max_delay)
    }

    fn delay_for(&self, attempt: u32, error: &Error) -> Duration {
        match error.kind() {
            ErrorKind::Throttled {
                retry_after: Some(retry_after),
            } => (*retry_after).min(self.options.max_delay),
            _ => jitter(self.backoff(attempt)),
        }
    }

    /// Runs `operation` until it succeeds, fails definitively, or the budget runs out.
    ///
    /// `operation` receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(&self, context: &Context, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let attempts = async {
            let mut attempt = 0;
            loop {
                attempt += 1;
                debug!(attempt, max_attempts, "sending");
                match operation(attempt).await {
                    Ok(value) => {
                        debug!(attempt, "succeeded");
                        return Ok(value);
                    }
                    Err(error) if !error.is_transient() => {
                        debug!(attempt, %error, "definitive failure");
                        return Err(error);
                    }
                    Err(error) if attempt >= max_attempts => {
                        warn!(attempt, %error, "retries exhausted");
                        return Err(Error::retries_exhausted(attempt, error));
                    }
                    Err(error) => {
                        let delay = self.delay_for(attempt, &error);
                        warn!(attempt, ?delay, %error, "transient failure, backing off");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        };

        match context.stop_token() {
            Some(token) if token.clone().now_or_never().is_some() => {
                debug!("cancelled before the first attempt");
                Err(Error::cancelled())
            }
            Some(token) => attempts
                .timeout_at(token.clone())
                .await
                .unwrap_or_else(|_| {
                    debug!("cancelled");
                    Err(Error::cancelled())
                }),
            None => attempts.await,
        }
    }
}

/// Picks a delay uniformly from `[delay / 2, delay]`.
fn jitter(delay: Duration) -> Duration {
    let half = delay / 2;
    half + half.mul_f64(rand::random::<f64>())
}
