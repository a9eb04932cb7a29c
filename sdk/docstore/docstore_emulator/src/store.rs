// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! In-memory account state.

use crate::sql::SelectStatement;
use docstore_client::{
    models::{ContainerProperties, DatabaseProperties, PartitionKeyDefinition},
    PartitionKey, Query,
};
use docstore_core::http::{Etag, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::{hash_map::DefaultHasher, BTreeMap, HashMap},
    hash::{Hash, Hasher},
};
use time::OffsetDateTime;

/// A request the store refused, rendered as an error response.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Failure {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl Failure {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequest", message)
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NotFound",
            format!("{what} does not exist"),
        )
    }

    pub fn conflict(what: &str) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            "Conflict",
            format!("{what} already exists"),
        )
    }

    pub fn precondition_failed() -> Self {
        Self::new(
            StatusCode::PRECONDITION_FAILED,
            "PreconditionFailed",
            "the resource has been modified since the supplied etag was issued",
        )
    }
}

pub(crate) type Outcome<T> = std::result::Result<T, Failure>;

/// What a successful write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Written {
    Created,
    Replaced,
}

/// Which partitions an item query covers.
#[derive(Debug, Clone)]
pub(crate) enum Scope {
    Partition(Vec<Value>),
    CrossPartition,
}

/// The position of the next page: a partition range and an offset into its matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Continuation {
    pub range: usize,
    pub offset: usize,
}

#[derive(Debug)]
struct DatabaseEntry {
    resource: Value,
    containers: BTreeMap<String, ContainerEntry>,
}

#[derive(Debug)]
struct ContainerEntry {
    resource: Value,
    partition_key: PartitionKeyDefinition,
    /// Keyed by (serialized partition key, id).
    items: BTreeMap<(String, String), Value>,
}

#[derive(Debug)]
pub(crate) struct Store {
    partition_count: usize,
    databases: BTreeMap<String, DatabaseEntry>,
}

impl Store {
    pub fn new(partition_count: usize) -> Self {
        Self {
            partition_count: partition_count.max(1),
            databases: BTreeMap::new(),
        }
    }

    pub fn create_database(&mut self, body: &[u8]) -> Outcome<Value> {
        let properties: DatabaseProperties = parse_body(body)?;
        check_id(&properties.id)?;
        if self.databases.contains_key(&properties.id) {
            return Err(Failure::conflict(&format!(
                "database '{}'",
                properties.id
            )));
        }

        let mut resource = to_value(&properties)?;
        stamp(&mut resource, &format!("dbs/{}/", new_rid()));
        self.databases.insert(
            properties.id,
            DatabaseEntry {
                resource: resource.clone(),
                containers: BTreeMap::new(),
            },
        );
        Ok(resource)
    }

    pub fn read_database(&self, id: &str) -> Outcome<Value> {
        Ok(self.database(id)?.resource.clone())
    }

    pub fn delete_database(&mut self, id: &str) -> Outcome<()> {
        self.databases
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Failure::not_found(&format!("database '{id}'")))
    }

    pub fn databases(&self) -> Vec<Value> {
        self.databases
            .values()
            .map(|entry| entry.resource.clone())
            .collect()
    }

    pub fn create_container(&mut self, database_id: &str, body: &[u8]) -> Outcome<Value> {
        let properties: ContainerProperties = parse_body(body)?;
        check_id(&properties.id)?;
        properties
            .partition_key
            .validate()
            .map_err(|error| Failure::bad_request(error.to_string()))?;

        let database = self.database_mut(database_id)?;
        if database.containers.contains_key(&properties.id) {
            return Err(Failure::conflict(&format!(
                "container '{}'",
                properties.id
            )));
        }

        let mut resource = to_value(&properties)?;
        stamp(
            &mut resource,
            &format!("dbs/{database_id}/colls/{}/", new_rid()),
        );
        database.containers.insert(
            properties.id,
            ContainerEntry {
                resource: resource.clone(),
                partition_key: properties.partition_key,
                items: BTreeMap::new(),
            },
        );
        Ok(resource)
    }

    pub fn read_container(&self, database_id: &str, container_id: &str) -> Outcome<Value> {
        Ok(self.container(database_id, container_id)?.resource.clone())
    }

    pub fn delete_container(&mut self, database_id: &str, container_id: &str) -> Outcome<()> {
        self.database_mut(database_id)?
            .containers
            .remove(container_id)
            .map(|_| ())
            .ok_or_else(|| Failure::not_found(&format!("container '{container_id}'")))
    }

    pub fn containers(&self, database_id: &str) -> Outcome<Vec<Value>> {
        Ok(self
            .database(database_id)?
            .containers
            .values()
            .map(|entry| entry.resource.clone())
            .collect())
    }

    /// Creates an item, or with `upsert` replaces an existing one.
    pub fn write_item(
        &mut self,
        database_id: &str,
        container_id: &str,
        partition_key: &[Value],
        body: &[u8],
        upsert: bool,
        if_match: Option<&Etag>,
    ) -> Outcome<(Written, Value)> {
        let container = self.container_mut(database_id, container_id)?;
        let (id, mut item) = parse_item(body)?;
        let key = container.item_key(partition_key, &item, &id)?;

        let existing = container.items.get(&key);
        let written = match (existing, upsert) {
            (Some(_), false) => return Err(Failure::conflict(&format!("item '{id}'"))),
            (Some(current), true) => {
                check_etag(current, if_match)?;
                Written::Replaced
            }
            (None, _) if if_match.is_some() => return Err(Failure::precondition_failed()),
            (None, _) => Written::Created,
        };

        stamp(
            &mut item,
            &format!("dbs/{database_id}/colls/{container_id}/docs/{}/", new_rid()),
        );
        container.items.insert(key, item.clone());
        Ok((written, item))
    }

    pub fn replace_item(
        &mut self,
        database_id: &str,
        container_id: &str,
        item_id: &str,
        partition_key: &[Value],
        body: &[u8],
        if_match: Option<&Etag>,
    ) -> Outcome<Value> {
        let container = self.container_mut(database_id, container_id)?;
        let (id, mut item) = parse_item(body)?;
        if id != item_id {
            return Err(Failure::bad_request(format!(
                "the id '{id}' in the body does not match '{item_id}'"
            )));
        }
        let key = container.item_key(partition_key, &item, &id)?;
        let current = container
            .items
            .get(&key)
            .ok_or_else(|| Failure::not_found(&format!("item '{id}'")))?;
        check_etag(current, if_match)?;

        let self_link = current
            .get("_self")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!("dbs/{database_id}/colls/{container_id}/docs/{}/", new_rid())
            });
        stamp(&mut item, &self_link);
        container.items.insert(key, item.clone());
        Ok(item)
    }

    pub fn read_item(
        &self,
        database_id: &str,
        container_id: &str,
        item_id: &str,
        partition_key: &[Value],
    ) -> Outcome<Value> {
        let container = self.container(database_id, container_id)?;
        container
            .items
            .get(&(partition_key_string(partition_key)?, item_id.to_string()))
            .cloned()
            .ok_or_else(|| Failure::not_found(&format!("item '{item_id}'")))
    }

    pub fn delete_item(
        &mut self,
        database_id: &str,
        container_id: &str,
        item_id: &str,
        partition_key: &[Value],
        if_match: Option<&Etag>,
    ) -> Outcome<()> {
        let container = self.container_mut(database_id, container_id)?;
        let key = (partition_key_string(partition_key)?, item_id.to_string());
        let current = container
            .items
            .get(&key)
            .ok_or_else(|| Failure::not_found(&format!("item '{item_id}'")))?;
        check_etag(current, if_match)?;
        container.items.remove(&key);
        Ok(())
    }

    /// Evaluates an item query, grouping matches by partition range.
    ///
    /// A single-partition scope yields exactly one range.
    pub fn query_items(
        &self,
        database_id: &str,
        container_id: &str,
        query: &Query,
        scope: &Scope,
    ) -> Outcome<Vec<Vec<Value>>> {
        let container = self.container(database_id, container_id)?;
        let statement = parse_query(query)?;
        let parameters = parameters(query);

        match scope {
            Scope::Partition(partition_key) => {
                let partition_key = partition_key_string(partition_key)?;
                let matches = filter(
                    container
                        .items
                        .iter()
                        .filter(|((pk, _), _)| *pk == partition_key)
                        .map(|(_, item)| item),
                    &statement,
                    &parameters,
                )?;
                Ok(vec![matches])
            }
            Scope::CrossPartition => {
                let mut ranges = vec![Vec::new(); self.partition_count];
                for ((pk, _), item) in &container.items {
                    ranges[partition_range(pk, self.partition_count)].push(item);
                }
                ranges
                    .into_iter()
                    .map(|items| filter(items.into_iter(), &statement, &parameters))
                    .collect()
            }
        }
    }

    /// Evaluates a query over a feed that is not partitioned, such as databases.
    pub fn query_feed(&self, resources: Vec<Value>, query: &Query) -> Outcome<Vec<Vec<Value>>> {
        let statement = parse_query(query)?;
        let matches = filter(resources.iter(), &statement, &parameters(query))?;
        Ok(vec![matches])
    }

    fn database(&self, id: &str) -> Outcome<&DatabaseEntry> {
        self.databases
            .get(id)
            .ok_or_else(|| Failure::not_found(&format!("database '{id}'")))
    }

    fn database_mut(&mut self, id: &str) -> Outcome<&mut DatabaseEntry> {
        self.databases
            .get_mut(id)
            .ok_or_else(|| Failure::not_found(&format!("database '{id}'")))
    }

    fn container(&self, database_id: &str, container_id: &str) -> Outcome<&ContainerEntry> {
        self.database(database_id)?
            .containers
            .get(container_id)
            .ok_or_else(|| Failure::not_found(&format!("container '{container_id}'")))
    }

    fn container_mut(
        &mut self,
        database_id: &str,
        container_id: &str,
    ) -> Outcome<&mut ContainerEntry> {
        self.database_mut(database_id)?
            .containers
            .get_mut(container_id)
            .ok_or_else(|| Failure::not_found(&format!("container '{container_id}'")))
    }
}

impl ContainerEntry {
    /// Checks the header partition key against the item and returns the storage key.
    fn item_key(&self, header: &[Value], item: &Value, id: &str) -> Outcome<(String, String)> {
        let extracted = self
            .partition_key
            .extract(item)
            .map_err(|error| Failure::bad_request(error.to_string()))?;
        if extracted_components(&extracted)? != header {
            return Err(Failure::bad_request(
                "the partition key in the header does not match the one in the document",
            ));
        }
        Ok((partition_key_string(header)?, id.to_string()))
    }
}

fn extracted_components(partition_key: &PartitionKey) -> Outcome<Vec<Value>> {
    partition_key
        .to_header_value()
        .and_then(|header| PartitionKey::parse_header_value(&header))
        .map_err(|error| Failure::bad_request(error.to_string()))
}

/// Picks the partition range an item lives in.
pub(crate) fn partition_range(partition_key: &str, partition_count: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    partition_key.hash(&mut hasher);
    (hasher.finish() % partition_count as u64) as usize
}

/// Slices one page out of range-grouped matches.
///
/// Pages never span ranges, so a range without matches produces an empty page that still
/// carries a continuation.
pub(crate) fn paginate(
    ranges: &[Vec<Value>],
    position: Option<Continuation>,
    page_size: usize,
) -> Outcome<(Vec<Value>, Option<Continuation>)> {
    let Continuation { range, offset } = position.unwrap_or(Continuation {
        range: 0,
        offset: 0,
    });
    let Some(matches) = ranges.get(range) else {
        return if ranges.is_empty() && position.is_none() {
            Ok((Vec::new(), None))
        } else {
            Err(Failure::bad_request("the continuation token is not valid"))
        };
    };
    if offset > matches.len() {
        return Err(Failure::bad_request("the continuation token is not valid"));
    }

    let end = (offset + page_size.max(1)).min(matches.len());
    let page = matches[offset..end].to_vec();
    let next = if end < matches.len() {
        Some(Continuation { range, offset: end })
    } else if range + 1 < ranges.len() {
        Some(Continuation {
            range: range + 1,
            offset: 0,
        })
    } else {
        None
    };
    Ok((page, next))
}

fn filter<'a>(
    items: impl Iterator<Item = &'a Value>,
    statement: &SelectStatement,
    parameters: &HashMap<String, Value>,
) -> Outcome<Vec<Value>> {
    let mut matches = Vec::new();
    for item in items {
        if statement
            .matches(item, parameters)
            .map_err(Failure::bad_request)?
        {
            matches.push(item.clone());
        }
    }
    Ok(matches)
}

fn parse_query(query: &Query) -> Outcome<SelectStatement> {
    SelectStatement::parse(query.text())
        .map_err(|message| Failure::bad_request(format!("unsupported query: {message}")))
}

fn parameters(query: &Query) -> HashMap<String, Value> {
    query
        .parameters()
        .map(|parameter| (parameter.name.clone(), parameter.value.clone()))
        .collect()
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Outcome<T> {
    serde_json::from_slice(body)
        .map_err(|error| Failure::bad_request(format!("the request body is invalid: {error}")))
}

fn to_value<T: Serialize>(value: &T) -> Outcome<Value> {
    serde_json::to_value(value).map_err(|error| {
        Failure::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalServerError",
            error.to_string(),
        )
    })
}

fn parse_item(body: &[u8]) -> Outcome<(String, Value)> {
    let item: Value = parse_body(body)?;
    let id = item
        .as_object()
        .and_then(|object| object.get("id"))
        .and_then(Value::as_str)
        .ok_or_else(|| Failure::bad_request("an item must be an object with a string 'id'"))?
        .to_string();
    check_id(&id)?;
    Ok((id, item))
}

fn check_id(id: &str) -> Outcome<()> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '?', '#']) {
        return Err(Failure::bad_request(format!("'{id}' is not a valid id")));
    }
    Ok(())
}

fn check_etag(current: &Value, if_match: Option<&Etag>) -> Outcome<()> {
    match if_match {
        Some(expected) if current.get("_etag").and_then(Value::as_str) != Some(expected.as_str()) => {
            Err(Failure::precondition_failed())
        }
        _ => Ok(()),
    }
}

fn partition_key_string(partition_key: &[Value]) -> Outcome<String> {
    serde_json::to_string(partition_key)
        .map_err(|error| Failure::bad_request(error.to_string()))
}

fn new_rid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Sets the system properties on a freshly written resource.
fn stamp(resource: &mut Value, self_link: &str) {
    let Some(object) = resource.as_object_mut() else {
        return;
    };
    let rid = self_link
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let system = Map::from_iter([
        ("_rid".to_string(), Value::String(rid)),
        ("_self".to_string(), Value::String(self_link.to_string())),
        (
            "_etag".to_string(),
            Value::String(format!("\"{}\"", uuid::Uuid::new_v4())),
        ),
        (
            "_ts".to_string(),
            Value::from(OffsetDateTime::now_utc().unix_timestamp()),
        ),
    ]);
    object.extend(system);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_container() -> Store {
        let mut store = Store::new(4);
        store.create_database(br#"{"id":"db"}"#).unwrap();
        store
            .create_container(
                "db",
                br#"{"id":"c","partitionKey":{"paths":["/lastName"],"kind":"Hash"}}"#,
            )
            .unwrap();
        store
    }

    fn write(store: &mut Store, id: &str, last_name: &str, upsert: bool) -> Outcome<Written> {
        let body = serde_json::to_vec(&json!({ "id": id, "lastName": last_name })).unwrap();
        store
            .write_item("db", "c", &[json!(last_name)], &body, upsert, None)
            .map(|(written, _)| written)
    }

    #[test]
    fn stamps_system_properties() {
        let mut store = Store::new(1);
        let database = store.create_database(br#"{"id":"db"}"#).unwrap();
        for property in ["_rid", "_self", "_etag", "_ts"] {
            assert!(database.get(property).is_some(), "{property}");
        }
    }

    #[test]
    fn conditional_upsert_of_a_missing_item_fails_the_precondition() {
        let mut store = store_with_container();
        let body = serde_json::to_vec(&json!({ "id": "1", "lastName": "Andersen" })).unwrap();
        let etag = Etag::from("\"stale\"".to_string());

        let failure = store
            .write_item("db", "c", &[json!("Andersen")], &body, true, Some(&etag))
            .unwrap_err();

        assert_eq!(failure.status, StatusCode::PRECONDITION_FAILED);
        assert!(store.read_item("db", "c", "1", &[json!("Andersen")]).is_err());
    }

    #[test]
    fn create_conflicts_and_upsert_replaces() {
        let mut store = store_with_container();
        assert_eq!(write(&mut store, "1", "Andersen", false), Ok(Written::Created));
        assert_eq!(
            write(&mut store, "1", "Andersen", false).unwrap_err().status,
            StatusCode::CONFLICT
        );
        assert_eq!(write(&mut store, "1", "Andersen", true), Ok(Written::Replaced));
        // Same id in another partition is a different item.
        assert_eq!(write(&mut store, "1", "Wakefield", false), Ok(Written::Created));
    }

    #[test]
    fn partition_key_must_match_document() {
        let mut store = store_with_container();
        let body = br#"{"id":"1","lastName":"Andersen"}"#;
        let failure = store
            .write_item("db", "c", &[json!("Wakefield")], body, false, None)
            .unwrap_err();
        assert_eq!(failure.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn etag_mismatch_is_a_failed_precondition() {
        let mut store = store_with_container();
        write(&mut store, "1", "Andersen", false).unwrap();
        let failure = store
            .delete_item("db", "c", "1", &[json!("Andersen")], Some(&Etag::from("\"stale\"")))
            .unwrap_err();
        assert_eq!(failure.status, StatusCode::PRECONDITION_FAILED);
    }

    #[test]
    fn deleting_a_database_removes_its_containers() {
        let mut store = store_with_container();
        store.delete_database("db").unwrap();
        assert_eq!(
            store.read_container("db", "c").unwrap_err().status,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn pagination_walks_every_range() {
        let ranges = vec![
            vec![json!(1), json!(2), json!(3)],
            vec![],
            vec![json!(4)],
        ];
        let mut position = None;
        let mut seen = Vec::new();
        let mut pages = 0;
        loop {
            let (page, next) = paginate(&ranges, position, 2).unwrap();
            seen.extend(page);
            pages += 1;
            match next {
                Some(next) => position = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec![json!(1), json!(2), json!(3), json!(4)]);
        assert_eq!(pages, 4);
    }

    #[test]
    fn bogus_continuations_are_rejected() {
        let ranges = vec![vec![json!(1)]];
        assert!(paginate(&ranges, Some(Continuation { range: 5, offset: 0 }), 1).is_err());
        assert!(paginate(&ranges, Some(Continuation { range: 0, offset: 9 }), 1).is_err());
    }
}
