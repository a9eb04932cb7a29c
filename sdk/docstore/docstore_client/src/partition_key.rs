// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use docstore_core::{Error, ErrorKind, Result};
use serde_json::{Map, Number, Value};

/// A single component of a [`PartitionKey`].
#[derive(Clone, Debug, PartialEq)]
pub enum PartitionKeyValue {
    String(String),
    Number(Number),
    Bool(bool),
    /// An explicit JSON `null` in the document.
    Null,
    /// The partition-key property is absent from the document.
    Undefined,
}

impl PartitionKeyValue {
    fn to_json(&self) -> Value {
        match self {
            PartitionKeyValue::String(s) => Value::String(s.clone()),
            PartitionKeyValue::Number(n) => Value::Number(n.clone()),
            PartitionKeyValue::Bool(b) => Value::Bool(*b),
            PartitionKeyValue::Null => Value::Null,
            PartitionKeyValue::Undefined => Value::Object(Map::new()),
        }
    }

    /// Converts a value found at a partition-key path in a document.
    ///
    /// Returns `None` for arrays and objects, which cannot be partition-key values.
    pub fn from_document_value(value: Option<&Value>) -> Option<Self> {
        match value {
            None => Some(PartitionKeyValue::Undefined),
            Some(Value::Null) => Some(PartitionKeyValue::Null),
            Some(Value::Bool(b)) => Some(PartitionKeyValue::Bool(*b)),
            Some(Value::Number(n)) => Some(PartitionKeyValue::Number(n.clone())),
            Some(Value::String(s)) => Some(PartitionKeyValue::String(s.clone())),
            Some(Value::Array(_)) | Some(Value::Object(_)) => None,
        }
    }
}

impl From<String> for PartitionKeyValue {
    fn from(value: String) -> Self {
        PartitionKeyValue::String(value)
    }
}

impl From<&str> for PartitionKeyValue {
    fn from(value: &str) -> Self {
        PartitionKeyValue::String(value.to_string())
    }
}

impl From<&String> for PartitionKeyValue {
    fn from(value: &String) -> Self {
        PartitionKeyValue::String(value.clone())
    }
}

impl From<bool> for PartitionKeyValue {
    fn from(value: bool) -> Self {
        PartitionKeyValue::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PartitionKeyValue {
                fn from(value: $t) -> Self {
                    PartitionKeyValue::Number(Number::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i32, i64, u32, u64);

impl From<f64> for PartitionKeyValue {
    /// Non-finite numbers have no JSON form and become [`PartitionKeyValue::Null`].
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(PartitionKeyValue::Number)
            .unwrap_or(PartitionKeyValue::Null)
    }
}

impl<T: Into<PartitionKeyValue>> From<Option<T>> for PartitionKeyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PartitionKeyValue::Null)
    }
}

/// The value used to route a request to a logical partition.
///
/// Every single-item operation takes a partition key. Anything convertible into a
/// [`PartitionKeyValue`] converts into a single-component key, and tuples convert into
/// hierarchical keys:
///
/// ```rust
/// use docstore_client::PartitionKey;
///
/// let simple = PartitionKey::from("Andersen");
/// let hierarchical = PartitionKey::from(("Andersen", 42));
/// assert_eq!(simple.to_header_value().unwrap(), r#"["Andersen"]"#);
/// assert_eq!(hierarchical.to_header_value().unwrap(), r#"["Andersen",42]"#);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionKey(Vec<PartitionKeyValue>);

impl PartitionKey {
    /// A key whose single component is JSON `null`.
    pub const NULL: PartitionKey = PartitionKey(Vec::new());

    pub fn values(&self) -> &[PartitionKeyValue] {
        &self.0
    }

    pub fn from_values(values: Vec<PartitionKeyValue>) -> Self {
        Self(values)
    }

    /// Renders the key as the JSON array carried in the partition-key header.
    pub fn to_header_value(&self) -> Result<String> {
        let values: Vec<Value> = if self.0.is_empty() {
            vec![Value::Null]
        } else {
            self.0.iter().map(PartitionKeyValue::to_json).collect()
        };
        Ok(serde_json::to_string(&values)?)
    }

    /// Parses a partition-key header back into its JSON components.
    pub fn parse_header_value(value: &str) -> Result<Vec<Value>> {
        let values: Vec<Value> = serde_json::from_str(value).map_err(|error| {
            Error::full(
                ErrorKind::InvalidArgument,
                error,
                "partition key header must be a JSON array",
            )
        })?;
        Ok(values)
    }
}

macro_rules! impl_single_component_key {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PartitionKey {
                fn from(value: $t) -> Self {
                    PartitionKey(vec![value.into()])
                }
            }
        )*
    };
}

impl_single_component_key!(
    PartitionKeyValue,
    String,
    &str,
    &String,
    bool,
    i32,
    i64,
    u32,
    u64,
    f64,
    Option<String>,
    Option<&str>
);

impl<A, B> From<(A, B)> for PartitionKey
where
    A: Into<PartitionKeyValue>,
    B: Into<PartitionKeyValue>,
{
    fn from((a, b): (A, B)) -> Self {
        PartitionKey(vec![a.into(), b.into()])
    }
}

impl<A, B, C> From<(A, B, C)> for PartitionKey
where
    A: Into<PartitionKeyValue>,
    B: Into<PartitionKeyValue>,
    C: Into<PartitionKeyValue>,
{
    fn from((a, b, c): (A, B, C)) -> Self {
        PartitionKey(vec![a.into(), b.into(), c.into()])
    }
}
