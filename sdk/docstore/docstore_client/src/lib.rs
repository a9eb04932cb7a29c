// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

#![doc = include_str!("../README.md")]

pub mod clients;
pub mod config;
mod connection_string;
pub mod constants;
mod feed;
pub mod models;
mod options;
mod partition_key;
pub mod pipeline;
pub mod query;
pub mod resource_context;

#[doc(inline)]
pub use clients::DocumentStoreClient;

pub use config::ClientConfig;
pub use connection_string::*;
pub use options::*;
pub use partition_key::*;
pub use query::{Query, QueryPartitionStrategy};

pub use feed::{FeedPage, FeedPager};
