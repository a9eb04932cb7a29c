// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod context;
mod credentials;
pub mod error;
pub mod http;
pub mod retry;

pub use context::*;
pub use credentials::*;
pub use error::{Error, ErrorKind, OptionalExt, Result, ResultExt};
pub use retry::{RetryOptions, RetryPolicy};

/// Re-exported so callers can build cancellation tokens without a direct dependency.
pub use stop_token;
