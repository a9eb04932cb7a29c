// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::{
    clients::DatabaseClient,
    config::ClientConfig,
    models::DatabaseProperties,
    pipeline::{DocumentStorePipeline, MasterKeyCredential},
    resource_context::{validate_id, ResourceLink, ResourceType},
    ConnectionString, CreateDatabaseOptions, DocumentStoreClientOptions, FeedPager, Query,
    QueryOptions, ReadDatabaseOptions,
};
use docstore_core::{
    http::{Method, Request, Response, Transport},
    Error, ErrorKind, OptionalExt, Result, RetryPolicy, Secret,
};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Client for a document store account.
///
/// A `DocumentStoreClient` is an ordinary value: construct one per account and clone it freely.
/// Clones share one transport (and its connection pool).
#[derive(Debug, Clone)]
pub struct DocumentStoreClient {
    endpoint: Url,
    databases_link: ResourceLink,
    pipeline: DocumentStorePipeline,
}

impl DocumentStoreClient {
    /// Creates a new client that signs requests with an account key.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The account endpoint, for example `https://localhost:8081/`.
    /// * `key` - The base64 account key.
    /// * `options` - Optional configuration for the client.
    ///
    /// Fails with [`ErrorKind::Configuration`] if the endpoint is not a URL or the key is not
    /// base64.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use docstore_client::DocumentStoreClient;
    ///
    /// let client = DocumentStoreClient::new(
    ///     "https://localhost:8081/",
    ///     "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw==",
    ///     None,
    /// )
    /// .unwrap();
    /// ```
    pub fn new(
        endpoint: &str,
        key: impl Into<Secret>,
        options: Option<DocumentStoreClientOptions>,
    ) -> Result<Self> {
        let options = options.unwrap_or_default();
        let endpoint: Url = endpoint.parse().map_err(|error| {
            Error::full(
                ErrorKind::Configuration,
                error,
                format!("'{endpoint}' is not a valid account endpoint"),
            )
        })?;
        let credential = MasterKeyCredential::new(&key.into())?;
        let transport = match options.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        let pipeline = DocumentStorePipeline::new(
            endpoint.clone(),
            transport,
            credential,
            RetryPolicy::new(options.retry),
        )?;

        Ok(Self {
            endpoint,
            databases_link: ResourceLink::root(ResourceType::Databases),
            pipeline,
        })
    }

    /// Creates a new client from a [`ClientConfig`], such as one read by
    /// [`ClientConfig::from_env`].
    pub fn from_config(
        config: &ClientConfig,
        options: Option<DocumentStoreClientOptions>,
    ) -> Result<Self> {
        Self::new(&config.endpoint, config.key.clone(), options)
    }

    /// Creates a new client from an `AccountEndpoint=...;AccountKey=...;` connection string.
    pub fn with_connection_string(
        connection_string: impl Into<Secret>,
        options: Option<DocumentStoreClientOptions>,
    ) -> Result<Self> {
        let connection_string = ConnectionString::try_from(&connection_string.into())?;
        Self::from_config(&connection_string.into(), options)
    }

    /// Gets a [`DatabaseClient`] for the database with the specified id.
    ///
    /// No request is sent; the database need not exist yet.
    pub fn database_client(&self, id: &str) -> DatabaseClient {
        DatabaseClient::new(self.pipeline.clone(), &self.databases_link, id)
    }

    /// The account endpoint this client sends requests to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Creates a new database.
    ///
    /// Fails with [`ErrorKind::Conflict`] if a database with this id already exists.
    #[tracing::instrument(skip_all, fields(database = %id))]
    pub async fn create_database(
        &self,
        id: &str,
        options: Option<CreateDatabaseOptions>,
    ) -> Result<Response<DatabaseProperties>> {
        validate_id(id)?;
        let options = options.unwrap_or_default();

        let mut req = Request::new(self.pipeline.url(&self.databases_link), Method::Post);
        req.set_json(&DatabaseProperties::new(id))?;
        self.pipeline
            .send(&options.method_options.context, req, &self.databases_link)
            .await
    }

    /// Ensures a database exists and returns its properties.
    ///
    /// Safe to call concurrently: if another caller creates the database between the
    /// existence check and the create, the existing database is read and returned.
    #[tracing::instrument(skip_all, fields(database = %id))]
    pub async fn create_database_if_not_exists(
        &self,
        id: &str,
        options: Option<CreateDatabaseOptions>,
    ) -> Result<DatabaseProperties> {
        validate_id(id)?;
        let options = options.unwrap_or_default();
        let database = self.database_client(id);
        let read_options = ReadDatabaseOptions {
            method_options: options.method_options.clone(),
        };

        if let Some(existing) = database
            .read(Some(read_options.clone()))
            .await
            .optional()?
        {
            info!("database already exists");
            return existing.into_body();
        }

        match self.create_database(id, Some(options)).await {
            Ok(created) => {
                info!("database created");
                created.into_body()
            }
            Err(error) if error.is_conflict() => {
                info!("database was created concurrently");
                database.read(Some(read_options)).await?.into_body()
            }
            Err(error) => Err(error),
        }
    }

    /// Executes a query against the databases in the account.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # async fn doc(client: docstore_client::DocumentStoreClient) -> docstore_core::Result<()> {
    /// use futures::TryStreamExt;
    ///
    /// let mut pages = client.query_databases("SELECT * FROM dbs", None)?;
    /// while let Some(page) = pages.try_next().await? {
    ///     for database in page.into_items() {
    ///         println!("{}", database.id);
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn query_databases(
        &self,
        query: impl Into<Query>,
        options: Option<QueryOptions>,
    ) -> Result<FeedPager<DatabaseProperties>> {
        let options = options.unwrap_or_default();
        self.pipeline.send_query_request(
            options.method_options.context,
            query.into(),
            self.databases_link.clone(),
            None,
            options.max_item_count,
        )
    }
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(docstore_core::http::ReqwestTransport::new(None)?))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn Transport>> {
    Err(Error::message(
        ErrorKind::Configuration,
        "no transport configured; enable the 'reqwest' feature or set DocumentStoreClientOptions::transport",
    ))
}
