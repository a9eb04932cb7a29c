// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use docstore_core::{
    http::{Etag, Transport},
    ClientMethodOptions, RetryOptions,
};
use std::sync::Arc;

/// Options used when creating a [`DocumentStoreClient`](crate::DocumentStoreClient).
#[derive(Clone, Debug, Default)]
pub struct DocumentStoreClientOptions {
    /// Bounds for retrying transient failures.
    pub retry: RetryOptions,

    /// The transport requests are sent through.
    ///
    /// When `None`, a pooled `reqwest` transport is created (requires the `reqwest` feature).
    pub transport: Option<Arc<dyn Transport>>,
}

/// Options to be passed to [`DocumentStoreClient::create_database()`](crate::DocumentStoreClient::create_database()).
#[derive(Clone, Debug, Default)]
pub struct CreateDatabaseOptions {
    pub method_options: ClientMethodOptions,
}

/// Options to be passed to [`DatabaseClient::read()`](crate::clients::DatabaseClient::read()).
#[derive(Clone, Debug, Default)]
pub struct ReadDatabaseOptions {
    pub method_options: ClientMethodOptions,
}

/// Options to be passed to [`DatabaseClient::delete()`](crate::clients::DatabaseClient::delete()).
#[derive(Clone, Debug, Default)]
pub struct DeleteDatabaseOptions {
    pub method_options: ClientMethodOptions,
}

/// Options to be passed to [`DatabaseClient::create_container()`](crate::clients::DatabaseClient::create_container()).
#[derive(Clone, Debug, Default)]
pub struct CreateContainerOptions {
    pub method_options: ClientMethodOptions,
}

/// Options to be passed to [`ContainerClient::read()`](crate::clients::ContainerClient::read()).
#[derive(Clone, Debug, Default)]
pub struct ReadContainerOptions {
    pub method_options: ClientMethodOptions,
}

/// Options to be passed to [`ContainerClient::delete()`](crate::clients::ContainerClient::delete()).
#[derive(Clone, Debug, Default)]
pub struct DeleteContainerOptions {
    pub method_options: ClientMethodOptions,
}

/// Options to be passed to single-item operations on a [`ContainerClient`](crate::clients::ContainerClient).
#[derive(Clone, Debug, Default)]
pub struct ItemOptions {
    pub method_options: ClientMethodOptions,

    /// Only apply a replace or delete if the item's current etag matches.
    ///
    /// A mismatch fails with [`ErrorKind::PreconditionFailed`](docstore_core::ErrorKind::PreconditionFailed).
    pub if_match_etag: Option<Etag>,
}

/// Options to be passed to query operations.
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    pub method_options: ClientMethodOptions,

    /// Requested page size. The service may return fewer items per page.
    pub max_item_count: Option<u32>,
}

impl QueryOptions {
    /// Creates a new [`QueryOptionsBuilder`] that can be used to construct a [`QueryOptions`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// let options = docstore_client::QueryOptions::builder()
    ///     .max_item_count(25)
    ///     .build();
    /// assert_eq!(options.max_item_count, Some(25));
    /// ```
    pub fn builder() -> QueryOptionsBuilder {
        QueryOptionsBuilder::default()
    }
}

/// Builder used to construct a [`QueryOptions`].
///
/// Obtain a [`QueryOptionsBuilder`] by calling [`QueryOptions::builder()`]
#[derive(Default)]
pub struct QueryOptionsBuilder(QueryOptions);

impl QueryOptionsBuilder {
    pub fn max_item_count(mut self, max_item_count: u32) -> Self {
        self.0.max_item_count = Some(max_item_count);
        self
    }

    pub fn method_options(mut self, method_options: ClientMethodOptions) -> Self {
        self.0.method_options = method_options;
        self
    }

    /// Builds a [`QueryOptions`] from the builder.
    ///
    /// This does not consume the builder, and can be called multiple times.
    pub fn build(&self) -> QueryOptions {
        self.0.clone()
    }
}
