// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::{
    constants,
    models::ContainerProperties,
    pipeline::{insert_partition_key, DocumentStorePipeline},
    resource_context::{validate_id, ResourceLink, ResourceType},
    DeleteContainerOptions, FeedPager, ItemOptions, PartitionKey, Query, QueryOptions,
    QueryPartitionStrategy, ReadContainerOptions,
};
use docstore_core::{
    http::{Method, Request, Response, IF_MATCH},
    Error, ErrorKind, Result,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// A client for working with a specific container in a database.
///
/// You can get a `ContainerClient` by calling [`DatabaseClient::container_client()`](crate::clients::DatabaseClient::container_client()).
///
/// Every item operation takes the item's partition key. It must match the value stored at the
/// container's partition-key path in the item itself.
#[derive(Debug, Clone)]
pub struct ContainerClient {
    container_id: String,
    link: ResourceLink,
    items_link: ResourceLink,
    pipeline: DocumentStorePipeline,
}

impl ContainerClient {
    pub(crate) fn new(
        pipeline: DocumentStorePipeline,
        containers_link: &ResourceLink,
        container_id: &str,
    ) -> Self {
        let container_id = container_id.to_string();
        let link = containers_link.item(&container_id);
        let items_link = link.feed(ResourceType::Items);

        Self {
            container_id,
            link,
            items_link,
            pipeline,
        }
    }

    /// Returns the identifier of the container.
    pub fn id(&self) -> &str {
        &self.container_id
    }

    /// Reads the properties of the container.
    #[tracing::instrument(skip_all, fields(container = %self.link))]
    pub async fn read(
        &self,
        options: Option<ReadContainerOptions>,
    ) -> Result<Response<ContainerProperties>> {
        let options = options.unwrap_or_default();
        let req = Request::new(self.pipeline.url(&self.link), Method::Get);
        self.pipeline
            .send(&options.method_options.context, req, &self.link)
            .await
    }

    /// Deletes the container and every item in it.
    #[tracing::instrument(skip_all, fields(container = %self.link))]
    pub async fn delete(&self, options: Option<DeleteContainerOptions>) -> Result<()> {
        let options = options.unwrap_or_default();
        let req = Request::new(self.pipeline.url(&self.link), Method::Delete);
        self.pipeline
            .send::<()>(&options.method_options.context, req, &self.link)
            .await?;
        Ok(())
    }

    /// Creates a new item in the container.
    ///
    /// Fails with [`ErrorKind::Conflict`] if an item with the same id already exists in the
    /// partition.
    ///
    /// # Arguments
    /// * `partition_key` - The partition key of the new item.
    /// * `item` - The item to create. Its JSON form must be an object with a string `id`.
    /// * `options` - Optional parameters for the request.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use serde::{Deserialize, Serialize};
    ///
    /// # async fn doc(container_client: docstore_client::clients::ContainerClient) -> docstore_core::Result<()> {
    /// #[derive(Debug, Deserialize, Serialize)]
    /// pub struct Product {
    ///     id: String,
    ///     category_id: String,
    ///     product_name: String,
    /// }
    /// let p = Product {
    ///     id: "product1".into(),
    ///     category_id: "category1".into(),
    ///     product_name: "Product #1".into(),
    /// };
    /// let created = container_client
    ///     .create_item("category1", p, None)
    ///     .await?
    ///     .into_body()?;
    /// # Ok(())
    /// # }
    /// ```
    #[tracing::instrument(skip_all, fields(container = %self.link))]
    pub async fn create_item<T: Serialize>(
        &self,
        partition_key: impl Into<PartitionKey>,
        item: T,
        options: Option<ItemOptions>,
    ) -> Result<Response<T>> {
        let options = options.unwrap_or_default();
        let body = item_body(&item)?;
        let mut req = Request::new(self.pipeline.url(&self.items_link), Method::Post);
        insert_partition_key(&mut req, &partition_key.into())?;
        req.set_json(&body)?;
        self.pipeline
            .send(&options.method_options.context, req, &self.items_link)
            .await
    }

    /// Creates the item, or replaces it in full if an item with the same id exists in the
    /// partition.
    #[tracing::instrument(skip_all, fields(container = %self.link))]
    pub async fn upsert_item<T: Serialize>(
        &self,
        partition_key: impl Into<PartitionKey>,
        item: T,
        options: Option<ItemOptions>,
    ) -> Result<Response<T>> {
        let options = options.unwrap_or_default();
        let body = item_body(&item)?;
        let mut req = Request::new(self.pipeline.url(&self.items_link), Method::Post);
        insert_partition_key(&mut req, &partition_key.into())?;
        req.insert_header(constants::IS_UPSERT, "True");
        insert_if_match(&mut req, &options);
        req.set_json(&body)?;
        self.pipeline
            .send(&options.method_options.context, req, &self.items_link)
            .await
    }

    /// Replaces an existing item in full.
    ///
    /// Fails with [`ErrorKind::NotFound`] if the item does not exist, and with
    /// [`ErrorKind::InvalidArgument`] if the `id` in `item` differs from `item_id`. Set
    /// [`ItemOptions::if_match_etag`] to only replace the version you last read.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # async fn doc(container_client: docstore_client::clients::ContainerClient) -> docstore_core::Result<()> {
    /// let mut family: serde_json::Value = container_client
    ///     .read_item("Wakefield", "Wakefield.7", None)
    ///     .await?
    ///     .into_body()?;
    /// family["isRegistered"] = true.into();
    /// container_client
    ///     .replace_item("Wakefield", "Wakefield.7", family, None)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    #[tracing::instrument(skip_all, fields(container = %self.link, item = %item_id))]
    pub async fn replace_item<T: Serialize>(
        &self,
        partition_key: impl Into<PartitionKey>,
        item_id: &str,
        item: T,
        options: Option<ItemOptions>,
    ) -> Result<Response<T>> {
        validate_id(item_id)?;
        let options = options.unwrap_or_default();
        let body = item_body(&item)?;
        if body.get("id").and_then(Value::as_str) != Some(item_id) {
            return Err(Error::message(
                ErrorKind::InvalidArgument,
                format!("the item's id does not match '{item_id}'"),
            ));
        }

        let link = self.items_link.item(item_id);
        let mut req = Request::new(self.pipeline.url(&link), Method::Put);
        insert_partition_key(&mut req, &partition_key.into())?;
        insert_if_match(&mut req, &options);
        req.set_json(&body)?;
        self.pipeline
            .send(&options.method_options.context, req, &link)
            .await
    }

    /// Reads a single item.
    ///
    /// Fails with [`ErrorKind::NotFound`] if the item does not exist. Use
    /// [`OptionalExt::optional`](docstore_core::OptionalExt::optional) when absence is expected.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use docstore_core::OptionalExt;
    ///
    /// # async fn doc(container_client: docstore_client::clients::ContainerClient) -> docstore_core::Result<()> {
    /// let item = container_client
    ///     .read_item::<serde_json::Value>("Andersen", "Andersen.1", None)
    ///     .await
    ///     .optional()?;
    /// if item.is_none() {
    ///     println!("not there yet");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[tracing::instrument(skip_all, fields(container = %self.link, item = %item_id))]
    pub async fn read_item<T: DeserializeOwned>(
        &self,
        partition_key: impl Into<PartitionKey>,
        item_id: &str,
        options: Option<ItemOptions>,
    ) -> Result<Response<T>> {
        validate_id(item_id)?;
        let options = options.unwrap_or_default();
        let link = self.items_link.item(item_id);
        let mut req = Request::new(self.pipeline.url(&link), Method::Get);
        insert_partition_key(&mut req, &partition_key.into())?;
        self.pipeline
            .send(&options.method_options.context, req, &link)
            .await
    }

    /// Deletes a single item.
    ///
    /// Fails with [`ErrorKind::NotFound`] if the item does not exist.
    #[tracing::instrument(skip_all, fields(container = %self.link, item = %item_id))]
    pub async fn delete_item(
        &self,
        partition_key: impl Into<PartitionKey>,
        item_id: &str,
        options: Option<ItemOptions>,
    ) -> Result<()> {
        validate_id(item_id)?;
        let options = options.unwrap_or_default();
        let link = self.items_link.item(item_id);
        let mut req = Request::new(self.pipeline.url(&link), Method::Delete);
        insert_partition_key(&mut req, &partition_key.into())?;
        insert_if_match(&mut req, &options);
        self.pipeline
            .send::<()>(&options.method_options.context, req, &link)
            .await?;
        Ok(())
    }

    /// Executes a query against items in the container.
    ///
    /// The returned [`FeedPager`] is lazy: no request is sent until it is polled. Use
    /// [`QueryPartitionStrategy::SinglePartition`] (or pass a partition key directly) to scope
    /// the query to one logical partition, or [`QueryPartitionStrategy::CrossPartition`] to
    /// fan out across the container.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use docstore_client::{Query, QueryPartitionStrategy};
    /// use futures::TryStreamExt;
    ///
    /// # async fn doc(container_client: docstore_client::clients::ContainerClient) -> docstore_core::Result<()> {
    /// let query = Query::from("SELECT * FROM f WHERE f.lastName = @lastName")
    ///     .with_parameter("@lastName", "Andersen")?;
    /// let mut items = container_client
    ///     .query_items::<serde_json::Value>(query, QueryPartitionStrategy::CrossPartition, None)?
    ///     .into_items();
    /// while let Some(item) = items.try_next().await? {
    ///     println!("{item}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn query_items<T: DeserializeOwned + Send + 'static>(
        &self,
        query: impl Into<Query>,
        partition_strategy: impl Into<QueryPartitionStrategy>,
        options: Option<QueryOptions>,
    ) -> Result<FeedPager<T>> {
        let options = options.unwrap_or_default();
        self.pipeline.send_query_request(
            options.method_options.context,
            query.into(),
            self.items_link.clone(),
            Some(partition_strategy.into()),
            options.max_item_count,
        )
    }
}

/// Serializes an item and checks it carries a usable `id`.
fn item_body<T: Serialize>(item: &T) -> Result<Value> {
    let body = serde_json::to_value(item)?;
    let id = body
        .as_object()
        .ok_or_else(|| {
            Error::message(
                ErrorKind::InvalidArgument,
                "an item must serialize to a JSON object",
            )
        })?
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::message(
                ErrorKind::InvalidArgument,
                "an item must have a string 'id' property",
            )
        })?;
    validate_id(id)?;
    Ok(body)
}

fn insert_if_match(req: &mut Request, options: &ItemOptions) {
    if let Some(etag) = &options.if_match_etag {
        req.insert_header(IF_MATCH, etag.as_str());
    }
}
