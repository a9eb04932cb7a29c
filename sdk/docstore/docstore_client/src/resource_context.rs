// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use docstore_core::{Error, ErrorKind, Result};
use std::fmt;

/// The kinds of resource the store exposes, in nesting order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Databases,
    Containers,
    Items,
}

impl ResourceType {
    /// The path segment naming a feed of this resource type.
    pub fn path_segment(self) -> &'static str {
        match self {
            ResourceType::Databases => "dbs",
            ResourceType::Containers => "colls",
            ResourceType::Items => "docs",
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "dbs" => Some(ResourceType::Databases),
            "colls" => Some(ResourceType::Containers),
            "docs" => Some(ResourceType::Items),
            _ => None,
        }
    }
}

/// Identifies either a single resource or a feed of resources.
///
/// A feed link (`dbs/{db}/colls`) has no item id; an item link (`dbs/{db}/colls/{coll}`) does.
/// Ids are kept unencoded; [`ResourceLink::segments`] is used to build URLs so that encoding
/// happens exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceLink {
    parent: Vec<String>,
    resource_type: ResourceType,
    item_id: Option<String>,
}

impl ResourceLink {
    /// A feed at the root of the account, such as `dbs`.
    pub fn root(resource_type: ResourceType) -> Self {
        Self {
            parent: Vec::new(),
            resource_type,
            item_id: None,
        }
    }

    /// The feed of `resource_type` children under this item.
    pub fn feed(&self, resource_type: ResourceType) -> Self {
        Self {
            parent: self.segments().map(str::to_string).collect(),
            resource_type,
            item_id: None,
        }
    }

    /// The item with id `item_id` in this feed.
    pub fn item(&self, item_id: impl Into<String>) -> Self {
        Self {
            parent: self.parent.clone(),
            resource_type: self.resource_type,
            item_id: Some(item_id.into()),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    /// Unencoded path segments, such as `["dbs", "db1", "colls"]`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.parent
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.resource_type.path_segment()))
            .chain(self.item_id.as_deref())
    }

    /// The link that request signatures are computed over.
    ///
    /// For an item this is its full path; for a feed it is the path of the owning item,
    /// which is empty for root feeds.
    pub fn resource_link(&self) -> String {
        match self.item_id {
            Some(_) => self.segments().collect::<Vec<_>>().join("/"),
            None => self.parent.join("/"),
        }
    }
}

impl fmt::Display for ResourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().collect::<Vec<_>>().join("/"))
    }
}

/// Checks that `id` can be used as a resource id.
///
/// Ids must be non-empty, must not be `.` or `..`, and must not contain `/`, `\\`, `?` or `#`.
pub(crate) fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::message(ErrorKind::InvalidArgument, "id must not be empty"));
    }
    // URL path normalization would drop these segments.
    if id == "." || id == ".." {
        return Err(Error::message(
            ErrorKind::InvalidArgument,
            format!("'{id}' is not a valid id"),
        ));
    }
    if let Some(c) = id.chars().find(|c| matches!(c, '/' | '\\' | '?' | '#')) {
        return Err(Error::message(
            ErrorKind::InvalidArgument,
            format!("id '{id}' contains the reserved character '{c}'"),
        ));
    }
    Ok(())
}
