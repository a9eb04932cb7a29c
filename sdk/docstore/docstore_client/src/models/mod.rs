// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Model types sent to and received from the document store.

mod container_properties;

pub use container_properties::*;

use docstore_core::http::Etag;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Properties the service maintains on every resource.
#[derive(Clone, Default, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SystemProperties {
    /// The entity tag associated with the resource.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "_etag")]
    pub etag: Option<Etag>,

    /// The self-link associated with the resource.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "_self")]
    pub self_link: Option<String>,

    /// The system-generated unique identifier associated with the resource.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "_rid")]
    pub resource_id: Option<String>,

    /// When the resource was last modified.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "_ts",
        with = "time::serde::timestamp::option"
    )]
    pub last_modified: Option<OffsetDateTime>,
}

/// Properties of a database.
#[derive(Clone, Default, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseProperties {
    pub id: String,

    #[serde(flatten)]
    pub system_properties: SystemProperties,
}

impl DatabaseProperties {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}
