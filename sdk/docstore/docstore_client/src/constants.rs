// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Header names and values used by the document store REST protocol.

use docstore_core::http::HeaderName;

pub const API_VERSION: &str = "2018-12-31";

pub const MS_DATE: HeaderName = HeaderName::from_static("x-ms-date");
pub const VERSION: HeaderName = HeaderName::from_static("x-ms-version");
pub const CLIENT_REQUEST_ID: HeaderName = HeaderName::from_static("x-ms-client-request-id");
pub const ACTIVITY_ID: HeaderName = HeaderName::from_static("x-ms-activity-id");
pub const PARTITION_KEY: HeaderName = HeaderName::from_static("x-ms-documentdb-partitionkey");
pub const IS_UPSERT: HeaderName = HeaderName::from_static("x-ms-documentdb-is-upsert");
pub const QUERY: HeaderName = HeaderName::from_static("x-ms-documentdb-isquery");
pub const QUERY_ENABLE_CROSS_PARTITION: HeaderName =
    HeaderName::from_static("x-ms-documentdb-query-enablecrosspartition");
pub const MAX_ITEM_COUNT: HeaderName = HeaderName::from_static("x-ms-max-item-count");
pub const CONTINUATION: HeaderName = HeaderName::from_static("x-ms-continuation");
pub const RETRY_AFTER_MS: HeaderName = HeaderName::from_static("x-ms-retry-after-ms");

pub const QUERY_CONTENT_TYPE: &str = "application/query+json";
