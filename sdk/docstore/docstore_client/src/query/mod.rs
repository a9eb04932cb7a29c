// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Query text, parameters, and partition scoping.

use crate::PartitionKey;
use docstore_core::Result;
use serde::{Deserialize, Serialize};

/// A SQL query with named parameters.
///
/// Queries without parameters can be created straight from a string:
///
/// ```rust
/// use docstore_client::Query;
///
/// let query = Query::from("SELECT * FROM c");
/// assert_eq!(query.text(), "SELECT * FROM c");
/// ```
///
/// Values are bound to `@name` placeholders with [`Query::with_parameter`], which keeps them
/// out of the query text:
///
/// ```rust
/// use docstore_client::Query;
///
/// let query = Query::from("SELECT * FROM c WHERE c.lastName = @lastName")
///     .with_parameter("@lastName", "Andersen")
///     .unwrap();
/// assert_eq!(query.parameters().count(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "query")]
    text: String,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    parameters: Vec<QueryParameter>,
}

impl Query {
    /// Binds a value to a named parameter, replacing any previous binding of the same name.
    ///
    /// Fails with [`ErrorKind::DataConversion`](docstore_core::ErrorKind::DataConversion) if the
    /// value cannot be serialized to JSON.
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Serialize,
    ) -> Result<Self> {
        let name = name.into();
        let value = serde_json::to_value(value)?;
        self.parameters.retain(|p| p.name != name);
        self.parameters.push(QueryParameter { name, value });
        Ok(self)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> impl Iterator<Item = &QueryParameter> {
        self.parameters.iter()
    }
}

impl<T: Into<String>> From<T> for Query {
    fn from(value: T) -> Self {
        Self {
            text: value.into(),
            parameters: vec![],
        }
    }
}

/// A named query parameter and its JSON value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryParameter {
    pub name: String,
    pub value: serde_json::Value,
}

/// Which partitions a query runs against.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryPartitionStrategy {
    /// Only the logical partition identified by the key.
    SinglePartition(PartitionKey),

    /// Every partition in the container.
    CrossPartition,
}

impl<T: Into<PartitionKey>> From<T> for QueryPartitionStrategy {
    fn from(value: T) -> Self {
        QueryPartitionStrategy::SinglePartition(value.into())
    }
}
