// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Clients used to communicate with a document store account.

mod container_client;
mod database_client;
mod document_store_client;

pub use container_client::ContainerClient;
pub use database_client::DatabaseClient;
pub use document_store_client::DocumentStoreClient;
