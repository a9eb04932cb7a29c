// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

mod authorization_policy;

pub use authorization_policy::{format_date, MasterKeyCredential};

use crate::{
    constants,
    feed::FeedBody,
    resource_context::ResourceLink,
    FeedPage, FeedPager, PartitionKey, Query, QueryPartitionStrategy,
};
use docstore_core::{
    http::{Method, RawResponse, Request, Response, Transport, AUTHORIZATION, CONTENT_TYPE},
    Context, Error, ErrorKind, Result, RetryPolicy,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::trace;
use url::Url;

/// Signs, sends and retries requests against a single account endpoint.
///
/// Cloning is cheap; clones share the transport and credential.
#[derive(Debug, Clone)]
pub(crate) struct DocumentStorePipeline {
    endpoint: Url,
    transport: Arc<dyn Transport>,
    credential: Arc<MasterKeyCredential>,
    retry: RetryPolicy,
}

impl DocumentStorePipeline {
    pub fn new(
        endpoint: Url,
        transport: Arc<dyn Transport>,
        credential: MasterKeyCredential,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if endpoint.cannot_be_a_base() {
            return Err(Error::message(
                ErrorKind::Configuration,
                format!("'{endpoint}' cannot be used as an account endpoint"),
            ));
        }
        Ok(Self {
            endpoint,
            transport,
            credential: Arc::new(credential),
            retry,
        })
    }

    /// Builds the URL for a resource link, percent-encoding each segment once.
    pub fn url(&self, link: &ResourceLink) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(link.segments());
        }
        url
    }

    /// Sends `request` under the retry policy.
    ///
    /// Every attempt is re-dated and re-signed. Non-success statuses are classified into an
    /// [`Error`]; transient ones are retried.
    pub async fn send<T>(
        &self,
        context: &Context,
        request: Request,
        link: &ResourceLink,
    ) -> Result<Response<T>> {
        let resource_type = link.resource_type().path_segment();
        let resource_link = link.resource_link();

        let raw = self
            .retry
            .execute(context, |attempt| {
                let mut request = request.clone();
                let resource_link = resource_link.as_str();
                async move {
                    self.sign(&mut request, resource_type, resource_link)?;
                    trace!(attempt, method = %request.method(), url = %request.url(), "request");
                    let response = self.transport.send(&request).await?;
                    trace!(attempt, status = %response.status(), "response");
                    check_status(response)
                }
            })
            .await?;
        Ok(Response::new(raw))
    }

    /// Starts a lazy, paginated query against the feed `link`.
    ///
    /// Nothing is sent until the returned pager is polled.
    pub fn send_query_request<T>(
        &self,
        context: Context,
        query: Query,
        link: ResourceLink,
        partition_strategy: Option<QueryPartitionStrategy>,
        max_item_count: Option<u32>,
    ) -> Result<FeedPager<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut base_request = Request::new(self.url(&link), Method::Post);
        base_request.insert_header(constants::QUERY, "True");
        base_request.insert_header(CONTENT_TYPE, constants::QUERY_CONTENT_TYPE);
        match partition_strategy {
            Some(QueryPartitionStrategy::SinglePartition(partition_key)) => {
                base_request.insert_header(
                    constants::PARTITION_KEY,
                    partition_key.to_header_value()?,
                );
            }
            Some(QueryPartitionStrategy::CrossPartition) => {
                base_request.insert_header(constants::QUERY_ENABLE_CROSS_PARTITION, "True");
            }
            None => {}
        }
        if let Some(max_item_count) = max_item_count {
            base_request.insert_header(constants::MAX_ITEM_COUNT, max_item_count.to_string());
        }
        base_request.set_json(&query)?;

        let pipeline = self.clone();
        let stream = futures::stream::unfold(PagerState::Initial, move |state| {
            let pipeline = pipeline.clone();
            let context = context.clone();
            let link = link.clone();
            let mut request = base_request.clone();
            async move {
                match state {
                    PagerState::Initial => {}
                    PagerState::Continue(token) => {
                        request.insert_header(constants::CONTINUATION, token);
                    }
                    PagerState::Done => return None,
                }

                let page = pipeline.fetch_page::<T>(&context, request, &link).await;
                let next = match &page {
                    Ok(page) => match page.continuation() {
                        Some(token) => PagerState::Continue(token.to_string()),
                        None => PagerState::Done,
                    },
                    Err(_) => PagerState::Done,
                };
                Some((page, next))
            }
        });

        Ok(FeedPager::new(stream))
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        context: &Context,
        request: Request,
        link: &ResourceLink,
    ) -> Result<FeedPage<T>> {
        let response: Response<FeedBody<T>> = self.send(context, request, link).await?;
        let headers = response.headers().clone();
        let continuation = headers
            .get_optional_str(&constants::CONTINUATION)
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        let body = response.into_body()?;
        trace!(
            items = body.items.len(),
            has_more = continuation.is_some(),
            "page"
        );
        Ok(FeedPage::new(body.items, continuation, headers))
    }

    fn sign(&self, request: &mut Request, resource_type: &str, resource_link: &str) -> Result<()> {
        let date = format_date(OffsetDateTime::now_utc())?;
        let authorization = self.credential.authorization_header(
            request.method(),
            resource_type,
            resource_link,
            &date,
        )?;
        request.insert_header(constants::MS_DATE, date);
        request.insert_header(constants::VERSION, constants::API_VERSION);
        request.insert_header(
            constants::CLIENT_REQUEST_ID,
            uuid::Uuid::new_v4().to_string(),
        );
        request.insert_header(AUTHORIZATION, authorization);
        Ok(())
    }
}

/// Adds the partition key header used by every single-item operation.
pub(crate) fn insert_partition_key(
    request: &mut Request,
    partition_key: &PartitionKey,
) -> Result<()> {
    request.insert_header(constants::PARTITION_KEY, partition_key.to_header_value()?);
    Ok(())
}

enum PagerState {
    Initial,
    Continue(String),
    Done,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

fn check_status(response: RawResponse) -> Result<RawResponse> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get_retry_after_ms(&constants::RETRY_AFTER_MS);
    let message = match serde_json::from_slice::<ErrorBody>(response.body()) {
        Ok(ErrorBody {
            code: Some(code),
            message: Some(message),
        }) => format!("{code}: {message}"),
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => message,
        _ => format!("service responded with status {status}"),
    };
    Err(Error::from_response(status, retry_after, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_context::ResourceType;
    use docstore_core::http::{Headers, StatusCode};

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait::async_trait]
    impl Transport for Unreachable {
        async fn send(&self, _request: &Request) -> Result<RawResponse> {
            Err(Error::message(ErrorKind::Other, "not used"))
        }
    }

    fn pipeline(endpoint: &str) -> DocumentStorePipeline {
        DocumentStorePipeline::new(
            endpoint.parse().unwrap(),
            Arc::new(Unreachable),
            MasterKeyCredential::new(&"AAAA".into()).unwrap(),
            RetryPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn urls_encode_ids_once() {
        let link = ResourceLink::root(ResourceType::Databases)
            .item("Family Database")
            .feed(ResourceType::Containers);
        assert_eq!(
            pipeline("https://localhost:8081/").url(&link).as_str(),
            "https://localhost:8081/dbs/Family%20Database/colls"
        );
        assert_eq!(
            pipeline("https://localhost:8081").url(&link).as_str(),
            "https://localhost:8081/dbs/Family%20Database/colls"
        );
    }

    #[test]
    fn rejects_non_base_endpoints() {
        let error = DocumentStorePipeline::new(
            "mailto:someone@example.com".parse().unwrap(),
            Arc::new(Unreachable),
            MasterKeyCredential::new(&"AAAA".into()).unwrap(),
            RetryPolicy::default(),
        )
        .unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::Configuration);
    }

    #[test]
    fn error_bodies_are_classified() {
        let mut headers = Headers::new();
        headers.insert(constants::RETRY_AFTER_MS, "20");
        let response = RawResponse::new(
            StatusCode::TOO_MANY_REQUESTS,
            headers,
            r#"{"code":"TooManyRequests","message":"rate exceeded"}"#,
        );

        let error = check_status(response).unwrap_err();
        assert_eq!(
            error.kind(),
            &ErrorKind::Throttled {
                retry_after: Some(std::time::Duration::from_millis(20))
            }
        );
        assert_eq!(error.http_status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert!(error.to_string().contains("rate exceeded"));
    }

    #[test]
    fn unparseable_error_bodies_still_classify() {
        let response = RawResponse::new(StatusCode::NOT_FOUND, Headers::new(), "<html/>");
        assert!(check_status(response).unwrap_err().is_not_found());
    }
}
