// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Creates a family database, stores two families, queries, updates and deletes them.
//!
//! Run against an account given by `--endpoint` and `--key` (or `DOCSTORE_ENDPOINT` and
//! `DOCSTORE_KEY`, or `DOCSTORE_CONNECTION_STRING`), or in-process with `--emulator`:
//!
//! ```text
//! cargo run --example getting_started -- --emulator
//! ```

use clap::Parser;
use docstore_client::{
    models::ContainerProperties, ClientConfig, DocumentStoreClient, ItemOptions, Query,
    QueryPartitionStrategy,
};
use docstore_core::RetryOptions;
use docstore_emulator::{Emulator, EmulatorOptions};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Cli {
    /// The account endpoint, such as `https://myaccount.example.com/`.
    #[arg(long, env = "DOCSTORE_ENDPOINT", requires = "key")]
    endpoint: Option<String>,

    /// The base64 account key.
    #[arg(long, env = "DOCSTORE_KEY", hide_env_values = true, requires = "endpoint")]
    key: Option<String>,

    /// Use an in-process emulator instead of a live account.
    #[arg(long)]
    emulator: bool,

    /// The database to create, and delete again at the end.
    #[arg(long, default_value = "FamilyDatabase")]
    database: String,

    /// The container to create inside the database.
    #[arg(long, default_value = "FamilyContainer")]
    container: String,

    /// Keep the database instead of deleting it at the end.
    #[arg(long)]
    keep: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Parent {
    #[serde(skip_serializing_if = "Option::is_none")]
    family_name: Option<String>,
    first_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Child {
    #[serde(skip_serializing_if = "Option::is_none")]
    family_name: Option<String>,
    first_name: String,
    gender: String,
    grade: u32,
    #[serde(default)]
    pets: Vec<Pet>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pet {
    given_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Address {
    state: String,
    county: String,
    city: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Family {
    id: String,
    last_name: String,
    parents: Vec<Parent>,
    children: Vec<Child>,
    address: Address,
    is_registered: bool,
}

fn parent(family_name: Option<&str>, first_name: &str) -> Parent {
    Parent {
        family_name: family_name.map(String::from),
        first_name: first_name.into(),
    }
}

fn pets(names: &[&str]) -> Vec<Pet> {
    names
        .iter()
        .map(|name| Pet {
            given_name: name.to_string(),
        })
        .collect()
}

fn families() -> [Family; 2] {
    [
        Family {
            id: "Andersen.1".into(),
            last_name: "Andersen".into(),
            parents: vec![parent(None, "Thomas"), parent(None, "Mary Kay")],
            children: vec![Child {
                family_name: None,
                first_name: "Henriette Thaulow".into(),
                gender: "female".into(),
                grade: 5,
                pets: pets(&["Fluffy"]),
            }],
            address: Address {
                state: "WA".into(),
                county: "King".into(),
                city: "Seattle".into(),
            },
            is_registered: false,
        },
        Family {
            id: "Wakefield.7".into(),
            last_name: "Wakefield".into(),
            parents: vec![
                parent(Some("Wakefield"), "Robin"),
                parent(Some("Miller"), "Ben"),
            ],
            children: vec![
                Child {
                    family_name: Some("Merriam".into()),
                    first_name: "Jesse".into(),
                    gender: "female".into(),
                    grade: 8,
                    pets: pets(&["Goofy", "Shadow"]),
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
        },
    ]
}

fn connect(cli: &Cli) -> Result<(DocumentStoreClient, Option<Emulator>), Box<dyn Error>> {
    if cli.emulator {
        let emulator = Emulator::new(EmulatorOptions::default())?;
        let client = emulator.client(RetryOptions::default())?;
        Ok((client, Some(emulator)))
    } else {
        let config = match (&cli.endpoint, &cli.key) {
            (Some(endpoint), Some(key)) => ClientConfig::new(endpoint, key.clone()),
            _ => ClientConfig::from_env()?,
        };
        Ok((DocumentStoreClient::from_config(&config, None)?, None))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let (client, _emulator) = connect(&cli)?;

    let database = client
        .create_database_if_not_exists(&cli.database, None)
        .await?;
    println!("Database ready: {}", database.id);

    let database = client.database_client(&cli.database);
    let container = database
        .create_container_if_not_exists(
            ContainerProperties {
                id: cli.container.clone(),
                partition_key: "/lastName".into(),
                ..Default::default()
            },
            None,
        )
        .await?;
    println!("Container ready: {}", container.id);
    let container = database.container_client(&cli.container);

    for family in families() {
        let id = family.id.clone();
        let last_name = family.last_name.clone();
        match container.create_item(&*last_name, family, None).await {
            Ok(_) => println!("Created item {id}"),
            Err(error) if error.is_conflict() => println!("Item {id} already exists"),
            Err(error) => return Err(error.into()),
        }
    }

    let query = Query::from("SELECT * FROM f WHERE f.lastName = @lastName")
        .with_parameter("@lastName", "Andersen")?;
    let mut pages =
        container.query_items::<Family>(query, QueryPartitionStrategy::CrossPartition, None)?;
    while let Some(page) = pages.try_next().await? {
        for family in page.into_items() {
            println!("Query result: {} ({} children)", family.id, family.children.len());
        }
    }

    let response = container
        .read_item::<Family>("Wakefield", "Wakefield.7", None)
        .await?;
    let etag = response.etag();
    let mut wakefield = response.into_body()?;
    println!("Read item {}", wakefield.id);

    wakefield.is_registered = true;
    if let Some(child) = wakefield.children.first_mut() {
        child.grade = 6;
    }
    container
        .replace_item(
            "Wakefield",
            "Wakefield.7",
            wakefield,
            Some(ItemOptions {
                if_match_etag: etag,
                ..Default::default()
            }),
        )
        .await?;
    println!("Replaced item Wakefield.7");

    container.delete_item("Andersen", "Andersen.1", None).await?;
    println!("Deleted item Andersen.1");

    if !cli.keep {
        database.delete(None).await?;
        println!("Deleted database {}", cli.database);
    }
    Ok(())
}
