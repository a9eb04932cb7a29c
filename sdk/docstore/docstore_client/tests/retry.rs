// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

mod framework;

use docstore_client::{DocumentStoreClient, ItemOptions, QueryOptions, QueryPartitionStrategy};
use docstore_core::{
    stop_token::StopSource, ClientMethodOptions, Context, ErrorKind, RetryOptions,
};
use docstore_emulator::{Fault, EMULATOR_ENDPOINT};
use framework::{andersen, family_container, fast_retry, wakefield, Family};
use futures::StreamExt;
use std::{
    error::Error,
    time::{Duration, Instant},
};

#[tokio::test]
async fn throttling_below_the_budget_is_absorbed() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(fast_retry(4))?).await?;

    emulator.inject_faults(
        [Fault::Throttle {
            retry_after: Some(Duration::from_millis(2)),
        }; 3],
    );
    let before = emulator.request_count();
    let created = container
        .create_item("Andersen", andersen(), None)
        .await?
        .into_body()?;

    assert_eq!(created, andersen());
    assert_eq!(emulator.request_count() - before, 4);
    Ok(())
}

#[tokio::test]
async fn throttling_past_the_budget_exhausts_retries() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(fast_retry(3))?).await?;

    emulator.inject_faults([Fault::Throttle { retry_after: None }; 3]);
    let before = emulator.request_count();
    let error = container
        .create_item("Andersen", andersen(), None)
        .await
        .unwrap_err();

    match error.kind() {
        ErrorKind::RetriesExhausted { attempts, last } => {
            assert_eq!(*attempts, 3);
            assert!(matches!(**last, ErrorKind::Throttled { .. }));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert!(error.last_error().is_some());
    assert_eq!(emulator.request_count() - before, 3);

    // Nothing was written by the throttled attempts.
    assert!(container
        .read_item::<Family>("Andersen", "Andersen.1", None)
        .await
        .unwrap_err()
        .is_not_found());
    Ok(())
}

#[tokio::test]
async fn every_transient_kind_is_retried() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(fast_retry(5))?).await?;
    container.create_item("Andersen", andersen(), None).await?;

    emulator.inject_faults([
        Fault::ServiceUnavailable,
        Fault::RequestTimeout,
        Fault::TransportTimeout,
    ]);
    let before = emulator.request_count();
    let read: Family = container
        .read_item("Andersen", "Andersen.1", None)
        .await?
        .into_body()?;

    assert_eq!(read, andersen());
    assert_eq!(emulator.request_count() - before, 4);
    Ok(())
}

#[tokio::test]
async fn definitive_failures_are_not_retried() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(fast_retry(5))?).await?;

    let before = emulator.request_count();
    let error = container
        .read_item::<Family>("Andersen", "missing", None)
        .await
        .unwrap_err();

    assert!(error.is_not_found());
    assert_eq!(emulator.request_count() - before, 1);
    Ok(())
}

#[tokio::test]
async fn wrong_keys_are_unauthorized_and_not_retried() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let client = DocumentStoreClient::new(
        EMULATOR_ENDPOINT,
        "d3Jvbmcta2V5",
        Some(emulator.client_options(fast_retry(5))),
    )?;

    let error = client
        .create_database("FamilyDatabase", None)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), &ErrorKind::Unauthorized);
    assert_eq!(emulator.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn cancellation_interrupts_the_backoff_wait() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let slow_retry = RetryOptions {
        max_attempts: 5,
        initial_delay: Duration::from_secs(30),
        max_delay: Duration::from_secs(30),
    };
    let container = family_container(&emulator.client(slow_retry)?).await?;

    emulator.inject_faults([Fault::Throttle { retry_after: None }]);
    let source = StopSource::new();
    let options = ItemOptions {
        method_options: ClientMethodOptions {
            context: Context::new().with_stop_token(source.token()),
        },
        ..Default::default()
    };
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(source);
    });

    let started = Instant::now();
    let error = container
        .create_item("Andersen", andersen(), Some(options))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), &ErrorKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[tokio::test]
async fn cancelled_contexts_fail_before_sending() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;

    let source = StopSource::new();
    let token = source.token();
    drop(source);

    let before = emulator.request_count();
    let error = container
        .read_item::<Family>(
            "Andersen",
            "Andersen.1",
            Some(ItemOptions {
                method_options: ClientMethodOptions {
                    context: Context::new().with_stop_token(token),
                },
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), &ErrorKind::Cancelled);
    assert_eq!(emulator.request_count(), before);
    Ok(())
}

#[tokio::test]
async fn cancelled_queries_yield_cancelled_and_end() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let container = family_container(&emulator.client(RetryOptions::none())?).await?;
    container.create_item("Andersen", andersen(), None).await?;

    let source = StopSource::new();
    let token = source.token();
    drop(source);

    let before = emulator.request_count();
    let mut pager = container.query_items::<Family>(
        "SELECT * FROM f",
        QueryPartitionStrategy::CrossPartition,
        Some(QueryOptions {
            method_options: ClientMethodOptions {
                context: Context::new().with_stop_token(token),
            },
            ..Default::default()
        }),
    )?;

    let first = pager.next().await.expect("the first poll yields a result");
    assert_eq!(first.unwrap_err().kind(), &ErrorKind::Cancelled);
    assert!(pager.next().await.is_none());
    assert_eq!(emulator.request_count(), before);
    Ok(())
}

#[tokio::test]
async fn cancellation_interrupts_a_page_backoff() -> Result<(), Box<dyn Error>> {
    let emulator = framework::emulator();
    let slow_retry = RetryOptions {
        max_attempts: 5,
        initial_delay: Duration::from_secs(30),
        max_delay: Duration::from_secs(30),
    };
    let container = family_container(&emulator.client(slow_retry)?).await?;
    container.create_item("Andersen", andersen(), None).await?;
    container.create_item("Wakefield", wakefield(), None).await?;

    let source = StopSource::new();
    let mut pager = container.query_items::<Family>(
        "SELECT * FROM f",
        QueryPartitionStrategy::CrossPartition,
        Some(
            QueryOptions::builder()
                .max_item_count(1)
                .method_options(ClientMethodOptions {
                    context: Context::new().with_stop_token(source.token()),
                })
                .build(),
        ),
    )?;
    pager.next().await.expect("a first page")?;

    emulator.inject_faults([Fault::Throttle { retry_after: None }]);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(source);
    });

    let started = Instant::now();
    let error = pager
        .next()
        .await
        .expect("a second poll yields a result")
        .unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(pager.next().await.is_none());
    Ok(())
}
