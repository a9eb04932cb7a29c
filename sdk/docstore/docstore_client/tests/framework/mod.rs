// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Helpers shared by the integration tests. Every test runs against its own emulator.

#![allow(dead_code)]

use docstore_client::{clients::ContainerClient, models::ContainerProperties, DocumentStoreClient};
use docstore_core::{Result, RetryOptions};
use docstore_emulator::{Emulator, EmulatorOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DATABASE: &str = "FamilyDatabase";
pub const CONTAINER: &str = "FamilyContainer";

/// Retries with millisecond delays so that transient-failure tests stay fast.
pub fn fast_retry(max_attempts: u32) -> RetryOptions {
    RetryOptions {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

pub fn emulator() -> Emulator {
    emulator_with(EmulatorOptions::default())
}

pub fn emulator_with(options: EmulatorOptions) -> Emulator {
    Emulator::new(options).expect("the default emulator key is valid")
}

/// Creates the family database and a container partitioned on `/lastName`.
pub async fn family_container(client: &DocumentStoreClient) -> Result<ContainerClient> {
    client.create_database_if_not_exists(DATABASE, None).await?;
    let database = client.database_client(DATABASE);
    database
        .create_container_if_not_exists(
            ContainerProperties {
                id: CONTAINER.into(),
                partition_key: "/lastName".into(),
                ..Default::default()
            },
            None,
        )
        .await?;
    Ok(database.container_client(CONTAINER))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    pub first_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub given_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    pub first_name: String,
    pub gender: String,
    pub grade: u32,
    #[serde(default)]
    pub pets: Vec<Pet>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub state: String,
    pub county: String,
    pub city: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: String,
    pub last_name: String,
    pub parents: Vec<Parent>,
    pub children: Vec<Child>,
    pub address: Address,
    pub is_registered: bool,
}

pub fn andersen() -> Family {
    Family {
        id: "Andersen.1".into(),
        last_name: "Andersen".into(),
        parents: vec![
            Parent {
                family_name: None,
                first_name: "Thomas".into(),
            },
            Parent {
                family_name: None,
                first_name: "Mary Kay".into(),
            },
        ],
        children: vec![Child {
            family_name: None,
            first_name: "Henriette Thaulow".into(),
            gender: "female".into(),
            grade: 5,
            pets: vec![Pet {
                given_name: "Fluffy".into(),
            }],
        }],
        address: Address {
            state: "WA".into(),
            county: "King".into(),
            city: "Seattle".into(),
        },
        is_registered: false,
    }
}

pub fn wakefield() -> Family {
    Family {
        id: "Wakefield.7".into(),
        last_name: "Wakefield".into(),
        parents: vec![
            Parent {
                family_name: Some("Wakefield".into()),
                first_name: "Robin".into(),
            },
            Parent {
                family_name: Some("Miller".into()),
                first_name: "Ben".into(),
            },
        ],
        children: vec![
            Child {
                family_name: Some("Merriam".into()),
                first_name: "Jesse".into(),
                gender: "female".into(),
                grade: 8,
                pets: vec![
                    Pet {
                        given_name: "Goofy".into(),
                    },
                    Pet {
                        given_name: "Shadow".into(),
                    },
                ],
            },
            Child {
                family_name: Some("Miller".into()),
                first_name: "Lisa".into(),
                gender: "female".into(),
                grade: 1,
                pets: vec![],
            },
        ],
        address: Address {
            state: "NY".into(),
            county: "Manhattan".into(),
            city: "NY".into(),
        },
        is_registered: false,
    }
}
