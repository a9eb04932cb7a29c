// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

mod framework;

use docstore_client::{models::ContainerProperties, ItemOptions};
use docstore_core::{ErrorKind, OptionalExt, RetryOptions};
use framework::{andersen, family_container, wakefield, Family};
use std::error::Error;

#[tokio::test]
async fn create_then_read_returns_an_equal_document() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;

    let created = container
        .create_item("Andersen", andersen(), None)
        .await?
        .into_body()?;
    let read: Family = container
        .read_item("Andersen", "Andersen.1", None)
        .await?
        .into_body()?;

    assert_eq!(created, andersen());
    assert_eq!(read, andersen());
    Ok(())
}

#[tokio::test]
async fn creating_twice_conflicts() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;

    container.create_item("Andersen", andersen(), None).await?;
    let error = container
        .create_item("Andersen", andersen(), None)
        .await
        .unwrap_err();

    assert!(error.is_conflict());
    Ok(())
}

#[tokio::test]
async fn replacing_twice_with_the_same_content_is_idempotent() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;
    container.create_item("Wakefield", wakefield(), None).await?;

    let mut updated = wakefield();
    updated.is_registered = true;
    updated.children[0].grade = 6;

    container
        .replace_item("Wakefield", "Wakefield.7", updated.clone(), None)
        .await?;
    let first: Family = container
        .read_item("Wakefield", "Wakefield.7", None)
        .await?
        .into_body()?;
    container
        .replace_item("Wakefield", "Wakefield.7", updated.clone(), None)
        .await?;
    let second: Family = container
        .read_item("Wakefield", "Wakefield.7", None)
        .await?
        .into_body()?;

    assert_eq!(first, updated);
    assert_eq!(second, first);
    Ok(())
}

#[tokio::test]
async fn replace_needs_an_existing_item_with_a_matching_id() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;

    let missing = container
        .replace_item("Andersen", "Andersen.1", andersen(), None)
        .await
        .unwrap_err();
    assert!(missing.is_not_found());

    let before = emulator.request_count();
    let mismatched = container
        .replace_item("Andersen", "Andersen.2", andersen(), None)
        .await
        .unwrap_err();
    assert_eq!(mismatched.kind(), &ErrorKind::InvalidArgument);
    assert_eq!(emulator.request_count(), before, "rejected before sending");
    Ok(())
}

#[tokio::test]
async fn delete_then_read_is_not_found() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;
    container.create_item("Andersen", andersen(), None).await?;

    container.delete_item("Andersen", "Andersen.1", None).await?;

    let error = container
        .read_item::<Family>("Andersen", "Andersen.1", None)
        .await
        .unwrap_err();
    assert!(error.is_not_found());
    assert!(container
        .read_item::<Family>("Andersen", "Andersen.1", None)
        .await
        .optional()?
        .is_none());

    let again = container
        .delete_item("Andersen", "Andersen.1", None)
        .await
        .unwrap_err();
    assert!(again.is_not_found());
    Ok(())
}

#[tokio::test]
async fn items_are_scoped_to_their_partition() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;
    container.create_item("Andersen", andersen(), None).await?;

    let wrong_partition = container
        .read_item::<Family>("Wakefield", "Andersen.1", None)
        .await
        .unwrap_err();
    assert!(wrong_partition.is_not_found());

    let mismatched_key = container
        .create_item("Wakefield", andersen(), None)
        .await
        .unwrap_err();
    assert_eq!(mismatched_key.kind(), &ErrorKind::InvalidArgument);
    Ok(())
}

#[tokio::test]
async fn upsert_creates_then_replaces() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;

    let created = container.upsert_item("Andersen", andersen(), None).await?;
    assert_eq!(created.status().as_u16(), 201);

    let mut registered = andersen();
    registered.is_registered = true;
    let replaced = container
        .upsert_item("Andersen", registered.clone(), None)
        .await?;
    assert_eq!(replaced.status().as_u16(), 200);

    let read: Family = container
        .read_item("Andersen", "Andersen.1", None)
        .await?
        .into_body()?;
    assert_eq!(read, registered);
    Ok(())
}

#[tokio::test]
async fn stale_etags_fail_the_precondition() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;

    let created = container.create_item("Andersen", andersen(), None).await?;
    let original_etag = created.etag().expect("writes return an etag");

    let mut registered = andersen();
    registered.is_registered = true;
    let replaced = container
        .replace_item(
            "Andersen",
            "Andersen.1",
            registered.clone(),
            Some(ItemOptions {
                if_match_etag: Some(original_etag.clone()),
                ..Default::default()
            }),
        )
        .await?;
    assert_ne!(replaced.etag(), Some(original_etag.clone()));

    let before = emulator.request_count();
    let stale = container
        .replace_item(
            "Andersen",
            "Andersen.1",
            andersen(),
            Some(ItemOptions {
                if_match_etag: Some(original_etag),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(stale.kind(), &ErrorKind::PreconditionFailed);
    assert_eq!(emulator.request_count(), before + 1, "not retried");
    Ok(())
}

#[tokio::test]
async fn invalid_items_are_rejected_locally() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;
    let before = emulator.request_count();

    let no_id = container
        .create_item("Andersen", serde_json::json!({ "lastName": "Andersen" }), None)
        .await
        .unwrap_err();
    let reserved = container
        .read_item::<Family>("Andersen", "a/b", None)
        .await
        .unwrap_err();

    assert_eq!(no_id.kind(), &ErrorKind::InvalidArgument);
    assert_eq!(reserved.kind(), &ErrorKind::InvalidArgument);
    assert_eq!(emulator.request_count(), before);
    Ok(())
}

#[tokio::test]
async fn dot_segment_ids_are_rejected_for_every_operation() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;
    let before = emulator.request_count();

    for id in [".", ".."] {
        let item = serde_json::json!({ "id": id, "lastName": "P" });
        let errors = [
            container.create_item("P", item.clone(), None).await.map(|_| ()),
            container.upsert_item("P", item.clone(), None).await.map(|_| ()),
            container
                .replace_item("P", id, item.clone(), None)
                .await
                .map(|_| ()),
            container
                .read_item::<serde_json::Value>("P", id, None)
                .await
                .map(|_| ()),
            container.delete_item("P", id, None).await,
        ];
        for error in errors {
            assert_eq!(error.unwrap_err().kind(), &ErrorKind::InvalidArgument, "{id}");
        }
    }

    assert_eq!(emulator.request_count(), before);
    Ok(())
}

#[tokio::test]
async fn if_not_exists_is_idempotent() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let client = emulator.client(RetryOptions::none())?;

    let first = client
        .create_database_if_not_exists("FamilyDatabase", None)
        .await?;
    let second = client
        .create_database_if_not_exists("FamilyDatabase", None)
        .await?;
    assert_eq!(
        first.system_properties.resource_id,
        second.system_properties.resource_id
    );

    let database = client.database_client("FamilyDatabase");
    let properties = ContainerProperties {
        id: "FamilyContainer".into(),
        partition_key: "/lastName".into(),
        ..Default::default()
    };
    let first = database
        .create_container_if_not_exists(properties.clone(), None)
        .await?;
    let second = database
        .create_container_if_not_exists(properties, None)
        .await?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn existing_container_with_other_partition_key_is_rejected() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let client = emulator.client(RetryOptions::none())?;
    family_container(&client).await?;

    let error = client
        .database_client(framework::DATABASE)
        .create_container_if_not_exists(
            ContainerProperties {
                id: framework::CONTAINER.into(),
                partition_key: "/id".into(),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), &ErrorKind::InvalidArgument);
    Ok(())
}

#[tokio::test]
async fn deleting_a_database_removes_its_contents() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let client = emulator.client(RetryOptions::none())?;
    let container = family_container(&client).await?;
    container.create_item("Andersen", andersen(), None).await?;

    client.database_client(framework::DATABASE).delete(None).await?;

    assert!(container.read(None).await.unwrap_err().is_not_found());
    assert!(container
        .read_item::<Family>("Andersen", "Andersen.1", None)
        .await
        .unwrap_err()
        .is_not_found());
    Ok(())
}
