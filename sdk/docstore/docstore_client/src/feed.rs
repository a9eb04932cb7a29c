// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use docstore_core::{http::Headers, Error, Result};
use futures::{stream::BoxStream, Stream, StreamExt, TryStreamExt};
use serde::Deserialize;
use std::{
    pin::Pin,
    task::{Context, Poll},
};

/// A single page of results from a query.
#[derive(Debug)]
pub struct FeedPage<T> {
    items: Vec<T>,
    continuation: Option<String>,
    headers: Headers,
}

impl<T> FeedPage<T> {
    pub(crate) fn new(items: Vec<T>, continuation: Option<String>, headers: Headers) -> Self {
        Self {
            items,
            continuation,
            headers,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// The token for the page after this one, or `None` if this is the last page.
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

/// The body of a query response page.
///
/// Each feed names its array differently; all of them deserialize into `items`.
#[derive(Deserialize)]
pub(crate) struct FeedBody<T> {
    #[serde(
        rename = "Documents",
        alias = "Databases",
        alias = "DocumentCollections"
    )]
    pub items: Vec<T>,
}

/// A lazy, paginated sequence of query results.
///
/// No request is sent until the pager is first polled. Each poll that needs more data fetches
/// one page, following the continuation token of the previous page; the sequence ends after a
/// page with no continuation. A pager cannot be restarted; issue the query again for a fresh one.
///
/// `FeedPager` is a [`Stream`] of pages. Use [`FeedPager::into_items`] to stream individual items.
pub struct FeedPager<T> {
    stream: BoxStream<'static, Result<FeedPage<T>>>,
}

impl<T: Send + 'static> FeedPager<T> {
    pub(crate) fn new(stream: impl Stream<Item = Result<FeedPage<T>>> + Send + 'static) -> Self {
        Self {
            stream: stream.boxed(),
        }
    }

    /// Flattens the pages into a stream of items.
    pub fn into_items(self) -> impl Stream<Item = Result<T>> + Send + 'static {
        self.stream
            .map_ok(|page| {
                let items = page.into_items().into_iter().map(Ok::<T, Error>);
                futures::stream::iter(items)
            })
            .try_flatten()
    }
}

impl<T> Stream for FeedPager<T> {
    type Item = Result<FeedPage<T>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx)
    }
}

impl<T> std::fmt::Debug for FeedPager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedPager").finish_non_exhaustive()
    }
}
