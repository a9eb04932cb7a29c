// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

#![doc = include_str!("../README.md")]

mod sql;
mod store;

use async_trait::async_trait;
use docstore_client::{
    constants,
    pipeline::MasterKeyCredential,
    resource_context::ResourceType,
    DocumentStoreClient, DocumentStoreClientOptions, PartitionKey, Query,
};
use docstore_core::{
    http::{
        Etag, HeaderName, Headers, Method, RawResponse, Request, StatusCode, Transport,
        AUTHORIZATION, CONTENT_TYPE, ETAG, IF_MATCH,
    },
    Error, ErrorKind, Result, RetryOptions, Secret,
};
use percent_encoding::percent_decode_str;
use serde_json::{json, Map, Value};
use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
    time::Duration,
};
use store::{paginate, Continuation, Failure, Outcome, Scope, Store, Written};
use tracing::debug;

/// The endpoint clients use to reach an [`Emulator`]. No network traffic is involved.
pub const EMULATOR_ENDPOINT: &str = "https://localhost:8081/";

/// The well-known account key the emulator accepts by default.
pub const EMULATOR_KEY: &str =
    "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw==";

/// Options used when creating an [`Emulator`].
#[derive(Clone, Debug)]
pub struct EmulatorOptions {
    /// The account key requests must be signed with.
    pub key: Secret,

    /// How many partition ranges items are spread over. Cross-partition queries return at
    /// least one page per range.
    pub partition_count: usize,

    /// Page size used when a query does not send `x-ms-max-item-count`.
    pub default_page_size: usize,
}

impl Default for EmulatorOptions {
    fn default() -> Self {
        Self {
            key: Secret::from(EMULATOR_KEY),
            partition_count: 4,
            default_page_size: 100,
        }
    }
}

/// A failure the emulator returns instead of handling a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Respond `429 Too Many Requests`, optionally with `x-ms-retry-after-ms`.
    Throttle { retry_after: Option<Duration> },
    /// Respond `503 Service Unavailable`.
    ServiceUnavailable,
    /// Respond `408 Request Timeout`.
    RequestTimeout,
    /// Fail in the transport itself, as a dropped connection would.
    TransportTimeout,
}

/// An in-memory document store that speaks the REST contract through the [`Transport`] seam.
///
/// Requests are authenticated, routed and answered without leaving the process. Clones share
/// state.
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> docstore_core::Result<()> {
/// use docstore_emulator::{Emulator, EmulatorOptions};
///
/// let emulator = Emulator::new(EmulatorOptions::default())?;
/// let client = emulator.client(Default::default())?;
/// client.create_database_if_not_exists("FamilyDatabase", None).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Emulator {
    inner: Arc<Inner>,
}

struct Inner {
    options: EmulatorOptions,
    credential: MasterKeyCredential,
    store: RwLock<Store>,
    faults: Mutex<VecDeque<Fault>>,
    requests: AtomicUsize,
}

impl Emulator {
    /// Creates an empty account.
    ///
    /// Fails with [`ErrorKind::Configuration`] if the key in `options` is not base64.
    pub fn new(options: EmulatorOptions) -> Result<Self> {
        let credential = MasterKeyCredential::new(&options.key)?;
        Ok(Self {
            inner: Arc::new(Inner {
                store: RwLock::new(Store::new(options.partition_count)),
                options,
                credential,
                faults: Mutex::new(VecDeque::new()),
                requests: AtomicUsize::new(0),
            }),
        })
    }

    /// Client options that route every request to this emulator.
    pub fn client_options(&self, retry: RetryOptions) -> DocumentStoreClientOptions {
        DocumentStoreClientOptions {
            retry,
            transport: Some(Arc::new(self.clone())),
        }
    }

    /// A client signed with the emulator's key.
    pub fn client(&self, retry: RetryOptions) -> Result<DocumentStoreClient> {
        DocumentStoreClient::new(
            EMULATOR_ENDPOINT,
            self.inner.options.key.clone(),
            Some(self.client_options(retry)),
        )
    }

    /// Queues faults. Each of the next requests consumes one, in order, instead of being handled.
    pub fn inject_faults(&self, faults: impl IntoIterator<Item = Fault>) {
        self.inner
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(faults);
    }

    /// Drops any faults that have not been consumed yet.
    pub fn clear_faults(&self) {
        self.inner
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Total number of requests received, including those answered with a fault.
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    fn next_fault(&self) -> Option<Fault> {
        self.inner
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn handle(&self, request: &Request) -> Outcome<RawResponse> {
        let segments = path_segments(request)?;
        self.authorize(request, &segments)?;

        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let is_query = header_is_true(request, &constants::QUERY);
        match (request.method(), segments.as_slice()) {
            (Method::Post, ["dbs"]) if is_query => {
                let query = parse_query(request)?;
                let store = self.read_store();
                let ranges = store.query_feed(store.databases(), &query)?;
                self.query_page(request, &ranges, "Databases")
            }
            (Method::Post, ["dbs"]) => {
                let database = self.write_store().create_database(request.body())?;
                Ok(resource_response(StatusCode::CREATED, database))
            }
            (Method::Get, ["dbs", db]) => {
                let database = self.read_store().read_database(db)?;
                Ok(resource_response(StatusCode::OK, database))
            }
            (Method::Delete, ["dbs", db]) => {
                self.write_store().delete_database(db)?;
                Ok(empty_response())
            }
            (Method::Post, ["dbs", db, "colls"]) if is_query => {
                let query = parse_query(request)?;
                let store = self.read_store();
                let ranges = store.query_feed(store.containers(db)?, &query)?;
                self.query_page(request, &ranges, "DocumentCollections")
            }
            (Method::Post, ["dbs", db, "colls"]) => {
                let container = self.write_store().create_container(db, request.body())?;
                Ok(resource_response(StatusCode::CREATED, container))
            }
            (Method::Get, ["dbs", db, "colls", coll]) => {
                let container = self.read_store().read_container(db, coll)?;
                Ok(resource_response(StatusCode::OK, container))
            }
            (Method::Delete, ["dbs", db, "colls", coll]) => {
                self.write_store().delete_container(db, coll)?;
                Ok(empty_response())
            }
            (Method::Post, ["dbs", db, "colls", coll, "docs"]) if is_query => {
                let query = parse_query(request)?;
                let scope = match partition_key(request)? {
                    Some(partition_key) => Scope::Partition(partition_key),
                    None if header_is_true(request, &constants::QUERY_ENABLE_CROSS_PARTITION) => {
                        Scope::CrossPartition
                    }
                    None => {
                        return Err(Failure::bad_request(
                            "a query needs a partition key or must enable cross-partition execution",
                        ))
                    }
                };
                let ranges = self.read_store().query_items(db, coll, &query, &scope)?;
                self.query_page(request, &ranges, "Documents")
            }
            (Method::Post, ["dbs", db, "colls", coll, "docs"]) => {
                let partition_key = required_partition_key(request)?;
                let upsert = header_is_true(request, &constants::IS_UPSERT);
                let (written, item) = self.write_store().write_item(
                    db,
                    coll,
                    &partition_key,
                    request.body(),
                    upsert,
                    if_match(request).as_ref(),
                )?;
                let status = match written {
                    Written::Created => StatusCode::CREATED,
                    Written::Replaced => StatusCode::OK,
                };
                Ok(resource_response(status, item))
            }
            (Method::Get, ["dbs", db, "colls", coll, "docs", id]) => {
                let partition_key = required_partition_key(request)?;
                let item = self
                    .read_store()
                    .read_item(db, coll, id, &partition_key)?;
                Ok(resource_response(StatusCode::OK, item))
            }
            (Method::Put, ["dbs", db, "colls", coll, "docs", id]) => {
                let partition_key = required_partition_key(request)?;
                let item = self.write_store().replace_item(
                    db,
                    coll,
                    id,
                    &partition_key,
                    request.body(),
                    if_match(request).as_ref(),
                )?;
                Ok(resource_response(StatusCode::OK, item))
            }
            (Method::Delete, ["dbs", db, "colls", coll, "docs", id]) => {
                let partition_key = required_partition_key(request)?;
                self.write_store().delete_item(
                    db,
                    coll,
                    id,
                    &partition_key,
                    if_match(request).as_ref(),
                )?;
                Ok(empty_response())
            }
            (method, _) => Err(Failure::new(
                StatusCode::new(405),
                "MethodNotAllowed",
                format!("{method} is not supported on '{}'", request.url().path()),
            )),
        }
    }

    /// Recomputes the request signature and compares it with the `authorization` header.
    fn authorize(&self, request: &Request, segments: &[String]) -> Outcome<()> {
        let unauthorized = |message: &str| {
            Failure::new(StatusCode::UNAUTHORIZED, "Unauthorized", message.to_string())
        };
        let date = request
            .headers()
            .get_optional_str(&constants::MS_DATE)
            .ok_or_else(|| unauthorized("the x-ms-date header is required"))?;
        let supplied = request
            .headers()
            .get_optional_str(&AUTHORIZATION)
            .ok_or_else(|| unauthorized("the authorization header is required"))?;

        if segments.is_empty() {
            return Err(Failure::not_found("the account root"));
        }
        // Feeds sign over their owner's link; single resources over their own.
        let (resource_type, resource_link) = if segments.len() % 2 == 1 {
            let (feed, owner) = segments
                .split_last()
                .ok_or_else(|| unauthorized("empty resource path"))?;
            (feed.as_str(), owner.join("/"))
        } else {
            (segments[segments.len() - 2].as_str(), segments.join("/"))
        };
        if ResourceType::from_path_segment(resource_type).is_none() {
            return Err(Failure::not_found(&format!("resource type '{resource_type}'")));
        }

        let expected = self
            .inner
            .credential
            .authorization_header(request.method(), resource_type, &resource_link, date)
            .map_err(|error| unauthorized(&error.to_string()))?;
        if expected != supplied {
            return Err(unauthorized("the request signature is not valid"));
        }
        Ok(())
    }

    fn query_page(
        &self,
        request: &Request,
        ranges: &[Vec<Value>],
        collection_name: &str,
    ) -> Outcome<RawResponse> {
        let position = request
            .headers()
            .get_optional_str(&constants::CONTINUATION)
            .map(|token| {
                serde_json::from_str::<Continuation>(token)
                    .map_err(|_| Failure::bad_request("the continuation token is not valid"))
            })
            .transpose()?;
        let page_size = request
            .headers()
            .get_optional_str(&constants::MAX_ITEM_COUNT)
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|size| *size > 0)
            .map(|size| size as usize)
            .unwrap_or(self.inner.options.default_page_size);

        let (items, next) = paginate(ranges, position, page_size)?;
        debug!(items = items.len(), has_more = next.is_some(), "query page");

        let mut headers = base_headers();
        headers.insert("x-ms-item-count", items.len().to_string());
        if let Some(next) = next {
            headers.insert(
                constants::CONTINUATION,
                serde_json::to_string(&next).unwrap_or_default(),
            );
        }
        let mut body = Map::new();
        body.insert("_rid".to_string(), Value::String(String::new()));
        body.insert("_count".to_string(), Value::from(items.len()));
        body.insert(collection_name.to_string(), Value::Array(items));
        Ok(RawResponse::new(
            StatusCode::OK,
            headers,
            Value::Object(body).to_string(),
        ))
    }

    fn read_store(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.inner
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.inner
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for Emulator {
    async fn send(&self, request: &Request) -> Result<RawResponse> {
        let count = self.inner.requests.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            count,
            method = %request.method(),
            path = %request.url().path(),
            "emulator request"
        );

        if let Some(fault) = self.next_fault() {
            debug!(?fault, "injecting fault");
            return match fault {
                Fault::TransportTimeout => Err(Error::message(
                    ErrorKind::NetworkTimeout,
                    "the emulated connection timed out",
                )),
                Fault::Throttle { retry_after } => {
                    let mut response = failure_response(Failure::new(
                        StatusCode::TOO_MANY_REQUESTS,
                        "TooManyRequests",
                        "the request rate is too large",
                    ));
                    if let Some(retry_after) = retry_after {
                        let (status, mut headers, body) = response.deconstruct();
                        headers.insert(
                            constants::RETRY_AFTER_MS,
                            retry_after.as_millis().to_string(),
                        );
                        response = RawResponse::new(status, headers, body);
                    }
                    Ok(response)
                }
                Fault::ServiceUnavailable => Ok(failure_response(Failure::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "ServiceUnavailable",
                    "the service is temporarily unavailable",
                ))),
                Fault::RequestTimeout => Ok(failure_response(Failure::new(
                    StatusCode::REQUEST_TIMEOUT,
                    "RequestTimeout",
                    "the request timed out",
                ))),
            };
        }

        let response = self.handle(request).unwrap_or_else(|failure| {
            debug!(status = %failure.status, code = failure.code, "request failed");
            failure_response(failure)
        });
        Ok(response)
    }
}

impl fmt::Debug for Emulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emulator")
            .field("partition_count", &self.inner.options.partition_count)
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

fn path_segments(request: &Request) -> Outcome<Vec<String>> {
    request
        .url()
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            percent_decode_str(segment)
                .decode_utf8()
                .map(|decoded| decoded.into_owned())
                .map_err(|_| Failure::bad_request("the request path is not valid UTF-8"))
        })
        .collect()
}

fn header_is_true(request: &Request, name: &HeaderName) -> bool {
    request
        .headers()
        .get_optional_str(name)
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

fn partition_key(request: &Request) -> Outcome<Option<Vec<Value>>> {
    request
        .headers()
        .get_optional_str(&constants::PARTITION_KEY)
        .map(|value| {
            PartitionKey::parse_header_value(value)
                .map_err(|error| Failure::bad_request(error.to_string()))
        })
        .transpose()
}

fn required_partition_key(request: &Request) -> Outcome<Vec<Value>> {
    partition_key(request)?
        .ok_or_else(|| Failure::bad_request("the partition key header is required"))
}

fn if_match(request: &Request) -> Option<Etag> {
    request
        .headers()
        .get_optional_str(&IF_MATCH)
        .map(Etag::from)
}

fn parse_query(request: &Request) -> Outcome<Query> {
    serde_json::from_slice(request.body())
        .map_err(|error| Failure::bad_request(format!("the query body is invalid: {error}")))
}

fn base_headers() -> Headers {
    let mut headers = Headers::new();
    headers.insert(CONTENT_TYPE, "application/json");
    headers.insert(constants::ACTIVITY_ID, uuid::Uuid::new_v4().to_string());
    headers
}

fn resource_response(status: StatusCode, resource: Value) -> RawResponse {
    let mut headers = base_headers();
    if let Some(etag) = resource.get("_etag").and_then(Value::as_str) {
        headers.insert(ETAG, etag);
    }
    RawResponse::new(status, headers, resource.to_string())
}

fn empty_response() -> RawResponse {
    RawResponse::new(StatusCode::NO_CONTENT, base_headers(), "")
}

fn failure_response(failure: Failure) -> RawResponse {
    let body = json!({ "code": failure.code, "message": failure.message });
    RawResponse::new(failure.status, base_headers(), body.to_string())
}
