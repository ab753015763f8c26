//! Tests for queue handles.

use super::*;
use crate::message::{CorrelationId, Priority};
use crate::status::{FailureCategory, StatusCode};
use std::sync::{Arc, Mutex as StdMutex};

/// What the scripted session saw on its last send
#[derive(Debug, Clone, Default)]
struct SentRecord {
    body: Vec<u8>,
    label: String,
    correlation_id: Option<CorrelationId>,
    transaction: u32,
    priority: Option<Priority>,
}

#[derive(Default)]
struct Script {
    send_status: Option<StatusCode>,
    receive_status: Option<StatusCode>,
    close_status: Option<StatusCode>,
    deliver: Option<Message>,
    sent: Vec<SentRecord>,
    fetches: Vec<(ReceiveTimeout, ReceiveAction)>,
    closes: usize,
}

/// Session that replays canned statuses and records what it was given
struct ScriptedSession {
    script: Arc<StdMutex<Script>>,
}

#[async_trait]
impl TransportSession for ScriptedSession {
    async fn send_bytes(
        &mut self,
        body: &[u8],
        label: &str,
        correlation_id: Option<&CorrelationId>,
        transaction: &TransactionMode,
        priority: Priority,
    ) -> StatusCode {
        let mut script = self.script.lock().unwrap();
        script.sent.push(SentRecord {
            body: body.to_vec(),
            label: label.to_string(),
            correlation_id: correlation_id.cloned(),
            transaction: transaction.value(),
            priority: Some(priority),
        });
        script.send_status.unwrap_or(StatusCode::SUCCESS)
    }

    async fn receive_bytes(
        &mut self,
        target: &mut Message,
        timeout: ReceiveTimeout,
        action: ReceiveAction,
    ) -> StatusCode {
        let mut script = self.script.lock().unwrap();
        script.fetches.push((timeout, action));
        if let Some(status) = script.receive_status {
            return status;
        }
        if let Some(message) = &script.deliver {
            *target = message.clone();
        }
        StatusCode::SUCCESS
    }

    async fn close(&mut self) -> StatusCode {
        let mut script = self.script.lock().unwrap();
        script.closes += 1;
        script.close_status.unwrap_or(StatusCode::SUCCESS)
    }
}

fn scripted<A: Access>(script: Script) -> (QueueHandle<A>, Arc<StdMutex<Script>>) {
    let script = Arc::new(StdMutex::new(script));
    let session = ScriptedSession {
        script: Arc::clone(&script),
    };
    let name = QueueName::new(r".\private$\scripted".to_string()).unwrap();
    (QueueHandle::opened(name, Box::new(session)), script)
}

#[tokio::test]
async fn test_send_passes_message_fields_through() {
    let (handle, script) = scripted::<SendOnly>(Script::default());
    let message = Message::from_text("body")
        .with_label("label")
        .with_correlation_id(CorrelationId::from_text("corr").unwrap());

    handle.send(&message).await.unwrap();

    let sent = script.lock().unwrap().sent[0].clone();
    assert_eq!(sent.body, b"body");
    assert_eq!(sent.label, "label");
    assert_eq!(sent.correlation_id, message.correlation_id);
    assert_eq!(sent.transaction, 0);
    assert_eq!(sent.priority, Some(Priority::Normal));
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_send_options_override_message_priority() {
    let (handle, script) = scripted::<SendAndReceive>(Script::default());
    let message = Message::from_text("x").with_priority(Priority::High);

    handle.send(&message).await.unwrap();
    handle.send_with_priority(&message, false).await.unwrap();
    handle
        .send_in_transaction(&Message::from_text("y"), TransactionMode::Single)
        .await
        .unwrap();

    let sent = script.lock().unwrap().sent.clone();
    assert_eq!(sent[0].priority, Some(Priority::High));
    assert_eq!(sent[1].priority, Some(Priority::Normal));
    assert_eq!(sent[2].priority, Some(Priority::Normal));
    assert_eq!(sent[2].transaction, 3);
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_send_convenience_forms_use_empty_label() {
    let (handle, script) = scripted::<SendOnly>(Script::default());

    handle.send_text("text").await.unwrap();
    handle.send_bytes(Bytes::from_static(b"raw")).await.unwrap();

    let sent = script.lock().unwrap().sent.clone();
    assert_eq!(sent[0].body, b"text");
    assert_eq!(sent[1].body, b"raw");
    assert!(sent.iter().all(|record| record.label.is_empty()));
    assert!(sent.iter().all(|record| record.correlation_id.is_none()));
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_send_failure_carries_status() {
    let (handle, _script) = scripted::<SendOnly>(Script {
        send_status: Some(StatusCode::ACCESS_DENIED),
        ..Script::default()
    });

    let error = handle.send_text("x").await.unwrap_err();
    assert_eq!(error.operation(), Some(Operation::Send));
    assert_eq!(error.category(), Some(FailureCategory::AccessDenied));
    assert_eq!(error.to_string(), "cannot send (hr=MQ_ERROR_ACCESS_DENIED)");
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_oversized_label_never_reaches_transport() {
    let (handle, script) = scripted::<SendOnly>(Script::default());
    let message = Message::from_text("x").with_label("l".repeat(251));

    let error = handle.send(&message).await.unwrap_err();
    assert!(matches!(error, QueueError::ValidationError(_)));
    assert!(script.lock().unwrap().sent.is_empty());
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_receive_returns_transport_message() {
    let delivered = Message::from_text("payload")
        .with_label("l")
        .with_priority(Priority::High);
    let (handle, _script) = scripted::<ReceiveOnly>(Script {
        deliver: Some(delivered.clone()),
        ..Script::default()
    });

    assert_eq!(handle.receive().await.unwrap(), delivered);
    assert_eq!(handle.peek().await.unwrap(), delivered);
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_receive_failure_carries_status() {
    let (handle, _script) = scripted::<ReceiveOnly>(Script {
        receive_status: Some(StatusCode::IO_TIMEOUT),
        ..Script::default()
    });

    let error = handle
        .receive_timeout(Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(error.is_timeout());
    assert_eq!(error.operation(), Some(Operation::Receive));

    let error = handle
        .peek_timeout(Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(error.is_timeout());
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_unknown_status_is_still_an_error() {
    let (handle, _script) = scripted::<ReceiveOnly>(Script {
        receive_status: Some(StatusCode::new(0xDEAD_BEEF)),
        ..Script::default()
    });

    let error = handle.receive().await.unwrap_err();
    assert_eq!(error.category(), Some(FailureCategory::Unknown(0xDEAD_BEEF)));
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_close_is_terminal() {
    let (handle, script) = scripted::<SendAndReceive>(Script::default());

    assert!(!handle.is_closed().await);
    handle.close().await.unwrap();
    assert!(handle.is_closed().await);

    let send = handle.send_text("x").await.unwrap_err();
    assert_eq!(send.category(), Some(FailureCategory::InvalidHandle));
    let receive = handle.receive().await.unwrap_err();
    assert_eq!(receive.category(), Some(FailureCategory::InvalidHandle));
    let close = handle.close().await.unwrap_err();
    assert_eq!(close.category(), Some(FailureCategory::InvalidHandle));

    let script = script.lock().unwrap();
    assert_eq!(script.closes, 1);
    assert!(script.sent.is_empty());
}

#[tokio::test]
async fn test_failed_close_still_releases_session() {
    let (handle, script) = scripted::<SendOnly>(Script {
        close_status: Some(StatusCode::SERVICE_NOT_AVAILABLE),
        ..Script::default()
    });

    let error = handle.close().await.unwrap_err();
    assert_eq!(error.operation(), Some(Operation::Close));
    assert!(handle.is_closed().await);
    assert_eq!(script.lock().unwrap().closes, 1);
}

#[tokio::test]
async fn test_opened_handle_metadata_is_unresolved() {
    let (handle, _script) = scripted::<ReceiveOnly>(Script::default());

    assert_eq!(handle.name().as_str(), r".\private$\scripted");
    assert_eq!(handle.access_mode(), AccessMode::Receive);
    assert!(handle.format_name().is_none());
    assert!(handle.label().is_none());
    assert!(handle.is_transactional().is_none());
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_creation_properties_are_recorded() {
    let (handle, _script) = scripted::<SendAndReceive>(Script::default());
    let handle = handle.with_creation_properties("Orders".to_string(), true);

    assert_eq!(handle.label(), Some("Orders"));
    assert_eq!(handle.is_transactional(), Some(true));
    assert_eq!(handle.access_mode(), AccessMode::SendAndReceive);
    handle.close().await.unwrap();
}

#[test]
fn test_send_options_builder() {
    let options = SendOptions::new()
        .with_high_priority(true)
        .with_transaction(TransactionMode::Single);
    assert_eq!(options.priority, Some(Priority::High));
    assert_eq!(options.transaction, TransactionMode::Single);

    assert_eq!(SendOptions::default().priority, None);
}

#[tokio::test]
async fn test_timeouts_reach_transport_with_zero_as_infinite() {
    let (handle, script) = scripted::<ReceiveOnly>(Script {
        deliver: Some(Message::from_text("x")),
        ..Script::default()
    });

    handle.receive_timeout(Duration::from_millis(250)).await.unwrap();
    handle.receive_timeout(Duration::ZERO).await.unwrap();
    handle.peek_timeout(Duration::ZERO).await.unwrap();
    handle.peek().await.unwrap();

    let fetches = script.lock().unwrap().fetches.clone();
    assert_eq!(
        fetches,
        vec![
            (
                ReceiveTimeout::After(Duration::from_millis(250)),
                ReceiveAction::Receive
            ),
            (ReceiveTimeout::Infinite, ReceiveAction::Receive),
            (ReceiveTimeout::Infinite, ReceiveAction::PeekCurrent),
            (ReceiveTimeout::Infinite, ReceiveAction::PeekCurrent),
        ]
    );
    handle.close().await.unwrap();
}
