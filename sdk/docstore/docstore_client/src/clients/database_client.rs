// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::{
    clients::ContainerClient,
    models::{ContainerProperties, DatabaseProperties},
    pipeline::DocumentStorePipeline,
    resource_context::{validate_id, ResourceLink, ResourceType},
    CreateContainerOptions, DeleteDatabaseOptions, FeedPager, Query, QueryOptions,
    ReadContainerOptions, ReadDatabaseOptions,
};
use docstore_core::{
    http::{Method, Request, Response},
    Error, ErrorKind, OptionalExt, Result,
};
use tracing::info;

/// A client for working with a specific database in an account.
///
/// You can get a `DatabaseClient` by calling [`DocumentStoreClient::database_client()`](crate::DocumentStoreClient::database_client()).
#[derive(Debug, Clone)]
pub struct DatabaseClient {
    database_id: String,
    link: ResourceLink,
    containers_link: ResourceLink,
    pipeline: DocumentStorePipeline,
}

impl DatabaseClient {
    pub(crate) fn new(
        pipeline: DocumentStorePipeline,
        databases_link: &ResourceLink,
        database_id: &str,
    ) -> Self {
        let database_id = database_id.to_string();
        let link = databases_link.item(&database_id);
        let containers_link = link.feed(ResourceType::Containers);

        Self {
            database_id,
            link,
            containers_link,
            pipeline,
        }
    }

    /// Returns the identifier of the database.
    pub fn id(&self) -> &str {
        &self.database_id
    }

    /// Gets a [`ContainerClient`] for the container with the specified id.
    pub fn container_client(&self, id: &str) -> ContainerClient {
        ContainerClient::new(self.pipeline.clone(), &self.containers_link, id)
    }

    /// Reads the properties of the database.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # async fn doc(client: docstore_client::DocumentStoreClient) -> docstore_core::Result<()> {
    /// let properties = client
    ///     .database_client("FamilyDatabase")
    ///     .read(None)
    ///     .await?
    ///     .into_body()?;
    /// # Ok(())
    /// # }
    /// ```
    #[tracing::instrument(skip_all, fields(database = %self.database_id))]
    pub async fn read(
        &self,
        options: Option<ReadDatabaseOptions>,
    ) -> Result<Response<DatabaseProperties>> {
        let options = options.unwrap_or_default();
        let req = Request::new(self.pipeline.url(&self.link), Method::Get);
        self.pipeline
            .send(&options.method_options.context, req, &self.link)
            .await
    }

    /// Deletes the database, along with every container and item in it.
    #[tracing::instrument(skip_all, fields(database = %self.database_id))]
    pub async fn delete(&self, options: Option<DeleteDatabaseOptions>) -> Result<()> {
        let options = options.unwrap_or_default();
        let req = Request::new(self.pipeline.url(&self.link), Method::Delete);
        self.pipeline
            .send::<()>(&options.method_options.context, req, &self.link)
            .await?;
        Ok(())
    }

    /// Creates a new container.
    ///
    /// Fails with [`ErrorKind::Conflict`] if a container with this id already exists.
    #[tracing::instrument(skip_all, fields(database = %self.database_id, container = %properties.id))]
    pub async fn create_container(
        &self,
        properties: ContainerProperties,
        options: Option<CreateContainerOptions>,
    ) -> Result<Response<ContainerProperties>> {
        validate_id(&properties.id)?;
        properties.partition_key.validate()?;
        let options = options.unwrap_or_default();

        let mut req = Request::new(self.pipeline.url(&self.containers_link), Method::Post);
        req.set_json(&properties)?;
        self.pipeline
            .send(&options.method_options.context, req, &self.containers_link)
            .await
    }

    /// Ensures a container exists and returns its properties.
    ///
    /// If the container already exists with a different partition-key definition, this fails
    /// with [`ErrorKind::InvalidArgument`]; partition keys cannot be changed after creation.
    #[tracing::instrument(skip_all, fields(database = %self.database_id, container = %properties.id))]
    pub async fn create_container_if_not_exists(
        &self,
        properties: ContainerProperties,
        options: Option<CreateContainerOptions>,
    ) -> Result<ContainerProperties> {
        validate_id(&properties.id)?;
        properties.partition_key.validate()?;
        let options = options.unwrap_or_default();
        let container = self.container_client(&properties.id);
        let read_options = ReadContainerOptions {
            method_options: options.method_options.clone(),
        };

        let existing = match container
            .read(Some(read_options.clone()))
            .await
            .optional()?
        {
            Some(existing) => {
                info!("container already exists");
                existing.into_body()?
            }
            None => match self
                .create_container(properties.clone(), Some(options))
                .await
            {
                Ok(created) => {
                    info!("container created");
                    return created.into_body();
                }
                Err(error) if error.is_conflict() => {
                    info!("container was created concurrently");
                    container.read(Some(read_options)).await?.into_body()?
                }
                Err(error) => return Err(error),
            },
        };

        if !existing.partition_key.same_paths(&properties.partition_key) {
            return Err(Error::message(
                ErrorKind::InvalidArgument,
                format!(
                    "container '{}' already exists with partition key paths {:?}, not {:?}",
                    existing.id, existing.partition_key.paths, properties.partition_key.paths
                ),
            ));
        }
        Ok(existing)
    }

    /// Executes a query against the containers in the database.
    ///
    /// The `query` parameter accepts anything that can be transformed [`Into`] a [`Query`].
    pub fn query_containers(
        &self,
        query: impl Into<Query>,
        options: Option<QueryOptions>,
    ) -> Result<FeedPager<ContainerProperties>> {
        let options = options.unwrap_or_default();
        self.pipeline.send_query_request(
            options.method_options.context,
            query.into(),
            self.containers_link.clone(),
            None,
            options.max_item_count,
        )
    }
}
