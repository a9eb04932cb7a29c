// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::fmt;
use stop_token::StopToken;

/// Per-operation context passed down the pipeline.
///
/// A context may carry a [`StopToken`]. When the token's [`StopSource`](stop_token::StopSource)
/// is dropped, any operation running under the context is abandoned at its next suspension
/// point and fails with [`ErrorKind::Cancelled`](crate::ErrorKind::Cancelled).
#[derive(Clone, Default)]
pub struct Context {
    stop_token: Option<StopToken>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop_token(mut self, token: StopToken) -> Self {
        self.stop_token = Some(token);
        self
    }

    pub fn stop_token(&self) -> Option<&StopToken> {
        self.stop_token.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancellable", &self.stop_token.is_some())
            .finish()
    }
}

/// Options common to every client method.
#[derive(Clone, Debug, Default)]
pub struct ClientMethodOptions {
    pub context: Context,
}
