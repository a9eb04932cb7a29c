// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::{models::SystemProperties, PartitionKey, PartitionKeyValue};
use docstore_core::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Properties of a container.
///
/// The partition key definition is fixed when the container is created.
///
/// ```rust
/// use docstore_client::models::ContainerProperties;
///
/// let properties = ContainerProperties {
///     id: "FamilyContainer".into(),
///     partition_key: "/lastName".into(),
///     ..Default::default()
/// };
/// assert_eq!(properties.partition_key.paths, vec!["/lastName".to_string()]);
/// ```
#[derive(Clone, Default, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerProperties {
    pub id: String,

    pub partition_key: PartitionKeyDefinition,

    #[serde(flatten)]
    pub system_properties: SystemProperties,
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum PartitionKeyKind {
    #[default]
    Hash,
    MultiHash,
}

/// The JSON paths a container's partition key is read from.
#[derive(Clone, Default, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionKeyDefinition {
    pub paths: Vec<String>,

    #[serde(default)]
    pub kind: PartitionKeyKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

impl PartitionKeyDefinition {
    pub fn new(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        let kind = if paths.len() > 1 {
            PartitionKeyKind::MultiHash
        } else {
            PartitionKeyKind::Hash
        };
        Self {
            paths,
            kind,
            version: Some(2),
        }
    }

    /// Checks that there is at least one path and that every path is absolute.
    pub fn validate(&self) -> Result<()> {
        if self.paths.is_empty() {
            return Err(Error::message(
                ErrorKind::InvalidArgument,
                "a partition key definition needs at least one path",
            ));
        }
        if let Some(path) = self
            .paths
            .iter()
            .find(|path| !path.starts_with('/') || path.len() < 2)
        {
            return Err(Error::message(
                ErrorKind::InvalidArgument,
                format!("partition key path '{path}' must start with '/' and name a property"),
            ));
        }
        Ok(())
    }

    /// Reads the partition key of `document` from this definition's paths.
    ///
    /// Missing properties yield [`PartitionKeyValue::Undefined`]. Fails with
    /// [`ErrorKind::InvalidArgument`] if a path points at an array or object.
    pub fn extract(&self, document: &Value) -> Result<PartitionKey> {
        let values = self
            .paths
            .iter()
            .map(|path| {
                PartitionKeyValue::from_document_value(document.pointer(path)).ok_or_else(|| {
                    Error::message(
                        ErrorKind::InvalidArgument,
                        format!("value at partition key path '{path}' must be a scalar"),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PartitionKey::from_values(values))
    }

    /// Returns `true` if both definitions route documents the same way.
    pub fn same_paths(&self, other: &PartitionKeyDefinition) -> bool {
        self.paths == other.paths
    }
}

impl From<&str> for PartitionKeyDefinition {
    fn from(path: &str) -> Self {
        PartitionKeyDefinition::new([path])
    }
}

impl From<String> for PartitionKeyDefinition {
    fn from(path: String) -> Self {
        PartitionKeyDefinition::new([path])
    }
}

impl From<(&str, &str)> for PartitionKeyDefinition {
    fn from((first, second): (&str, &str)) -> Self {
        PartitionKeyDefinition::new([first, second])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_in_wire_shape() {
        let properties = ContainerProperties {
            id: "FamilyContainer".into(),
            partition_key: "/lastName".into(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&properties).unwrap(),
            json!({
                "id": "FamilyContainer",
                "partitionKey": { "paths": ["/lastName"], "kind": "Hash", "version": 2 }
            })
        );
    }

    #[test]
    fn hierarchical_definitions_use_multi_hash() {
        let definition = PartitionKeyDefinition::from(("/tenantId", "/userId"));
        assert_eq!(definition.kind, PartitionKeyKind::MultiHash);
    }

    #[test]
    fn validation() {
        assert!(PartitionKeyDefinition::from("/lastName").validate().is_ok());
        assert!(PartitionKeyDefinition::from("lastName").validate().is_err());
        assert!(PartitionKeyDefinition::from("/").validate().is_err());
        assert!(PartitionKeyDefinition::default().validate().is_err());
    }

    #[test]
    fn extracts_nested_values() {
        let definition = PartitionKeyDefinition::from("/address/state");
        let document = json!({ "id": "1", "address": { "state": "WA" } });
        assert_eq!(
            definition.extract(&document).unwrap(),
            PartitionKey::from("WA")
        );

        let missing = json!({ "id": "2" });
        assert_eq!(
            definition.extract(&missing).unwrap(),
            PartitionKey::from(PartitionKeyValue::Undefined)
        );

        let object = json!({ "id": "3", "address": { "state": { "code": "WA" } } });
        assert!(definition.extract(&object).is_err());
    }
}
