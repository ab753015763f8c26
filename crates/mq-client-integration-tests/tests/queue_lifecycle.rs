//! Integration tests for queue and handle lifecycle
//!
//! These tests verify:
//! - Create returns a usable handle carrying the supplied properties
//! - Create on an existing path and delete on a missing path fail with their categories
//! - Closed handles reject every operation
//! - Dropping a handle releases its transport session
//! - Handles on a deleted queue report the deletion

mod common;

use common::{in_memory_admin, text, unique_queue};
use mq_client::prelude::*;
use mq_client::{AddressScheme, Operation};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_create_then_round_trip() {
    let (admin, _transport) = in_memory_admin();
    let path = unique_queue("round-trip");

    let queue = admin.create(&path, "Round trip", false).await.unwrap();
    assert_eq!(queue.label(), Some("Round trip"));
    assert_eq!(queue.is_transactional(), Some(false));

    queue.send_text("hello").await.unwrap();
    let message = queue.receive_timeout(Duration::from_secs(1)).await.unwrap();
    assert_eq!(text(&message), "hello");

    queue.close().await.unwrap();
    admin.delete(&path).await.unwrap();
}

#[tokio::test]
async fn test_create_existing_queue() {
    let (admin, _transport) = in_memory_admin();
    let path = unique_queue("exists");
    admin.create(&path, "", false).await.unwrap().close().await.unwrap();

    let error = admin.create(&path, "", false).await.unwrap_err();
    assert_eq!(error.category(), Some(FailureCategory::QueueExists));
    assert_eq!(
        error.to_string(),
        "cannot create queue (hr=MQ_ERROR_QUEUE_EXISTS)"
    );
}

#[tokio::test]
async fn test_delete_missing_queue() {
    let (admin, _transport) = in_memory_admin();

    let error = admin.delete(&unique_queue("missing")).await.unwrap_err();
    assert_eq!(error.category(), Some(FailureCategory::QueueNotFound));
    assert_eq!(error.operation(), Some(Operation::Delete));
}

#[tokio::test]
async fn test_open_missing_queue() {
    let (admin, _transport) = in_memory_admin();

    let error = admin
        .open::<ReceiveOnly>(&unique_queue("missing"))
        .await
        .unwrap_err();
    assert_eq!(error.category(), Some(FailureCategory::QueueNotFound));
    assert!(!error.is_transient());
}

#[tokio::test]
async fn test_operations_after_close_fail() {
    let (admin, _transport) = in_memory_admin();
    let queue = admin
        .create(&unique_queue("closed"), "", false)
        .await
        .unwrap();

    queue.close().await.unwrap();

    for error in [
        queue.send_text("x").await.unwrap_err(),
        queue.receive().await.unwrap_err(),
        queue.peek_timeout(Duration::from_millis(10)).await.unwrap_err(),
        queue.close().await.unwrap_err(),
    ] {
        assert_eq!(error.category(), Some(FailureCategory::InvalidHandle));
    }
}

#[tokio::test]
async fn test_dropping_handle_releases_session() {
    let (admin, transport) = in_memory_admin();
    let path = unique_queue("dropped");

    {
        let _created = admin.create(&path, "", false).await.unwrap();
        let _sender = admin.open::<SendOnly>(&path).await.unwrap();
        assert_eq!(transport.open_session_count(), 2);
    }

    assert_eq!(transport.open_session_count(), 0);
}

#[tokio::test]
async fn test_deleted_queue_reported_on_open_handle() {
    let (admin, _transport) = in_memory_admin();
    let path = unique_queue("deleted");
    let queue = admin.create(&path, "", false).await.unwrap();

    admin.delete(&path).await.unwrap();

    let send = queue.send_text("x").await.unwrap_err();
    assert_eq!(send.category(), Some(FailureCategory::QueueDeleted));
    let receive = queue
        .receive_timeout(Duration::from_millis(10))
        .await
        .unwrap_err();
    assert_eq!(receive.category(), Some(FailureCategory::QueueDeleted));

    queue.close().await.unwrap();
}

#[tokio::test]
async fn test_opened_handle_metadata_is_unresolved() {
    let (admin, _transport) = in_memory_admin();
    let path = unique_queue("metadata");
    admin
        .create(&path, "Label", true)
        .await
        .unwrap()
        .close()
        .await
        .unwrap();

    let queue = admin.open_default(&path).await.unwrap();
    assert_eq!(queue.name().as_str(), path);
    assert_eq!(queue.format_name(), None);
    assert_eq!(queue.label(), None);
    assert_eq!(queue.is_transactional(), None);
    queue.close().await.unwrap();
}

#[test]
fn test_format_name_scheme_selection() {
    let tcp = QueueAdmin::format_name(r"192.168.0.10\private$\q").unwrap();
    assert_eq!(tcp.scheme(), AddressScheme::Tcp);
    assert_eq!(tcp.to_string(), r"DIRECT=TCP:192.168.0.10\private$\q");

    let os = QueueAdmin::format_name(r".\private$\q").unwrap();
    assert_eq!(os.scheme(), AddressScheme::Os);
    assert_eq!(os.to_string(), r"DIRECT=OS:.\private$\q");
}

#[tokio::test]
async fn test_handle_shared_between_tasks() {
    let (admin, transport) = in_memory_admin();
    let path = unique_queue("shared");
    let queue = Arc::new(admin.create(&path, "", false).await.unwrap());

    let mut tasks = Vec::new();
    for task in 0..8 {
        let queue = Arc::clone(&queue);
        tasks.push(tokio::spawn(async move {
            for n in 0..10 {
                queue.send_text(&format!("{}-{}", task, n)).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(transport.message_count(&path), Some(80));
    queue.close().await.unwrap();
}
