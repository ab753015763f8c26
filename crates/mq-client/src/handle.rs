//! Open queue handles and the capability traits they implement.
//!
//! A handle's access mode is part of its type. [`Sender`] handles only
//! implement [`MessageSender`], [`Receiver`] handles only implement
//! [`MessageReceiver`], and [`SenderReceiver`] handles implement both, so a
//! receive on a send-only handle does not compile.
//!
//! Each handle owns exactly one transport session. Boundary calls hold the
//! handle's session lock for their whole duration, so concurrent callers on
//! one handle are serialized; a blocking receive therefore also delays sends
//! issued through the same handle. Closing is terminal: once [`QueueHandle::close`]
//! has run, every further operation fails with an invalid-handle error.
//! Closing from another task while a receive is blocked is not supported;
//! the close waits for the receive to finish.
//!
//! A send-only handle has no receive or peek:
//!
//! ```compile_fail
//! use mq_client::prelude::*;
//!
//! # async fn drain(admin: QueueAdmin) -> Result<(), QueueError> {
//! let sender = admin.open::<SendOnly>(r".\private$\orders").await?;
//! let message = sender.receive().await?;
//! # Ok(())
//! # }
//! ```
//!
//! and a receive-only handle cannot send:
//!
//! ```compile_fail
//! use mq_client::prelude::*;
//!
//! # async fn feed(admin: QueueAdmin) -> Result<(), QueueError> {
//! let receiver = admin.open::<ReceiveOnly>(r".\private$\orders").await?;
//! receiver.send_text("order").await?;
//! # Ok(())
//! # }
//! ```
//!
//! A handle opened for both directions does both:
//!
//! ```no_run
//! use mq_client::prelude::*;
//!
//! # async fn echo(admin: QueueAdmin) -> Result<(), QueueError> {
//! let queue = admin.open::<SendAndReceive>(r".\private$\orders").await?;
//! queue.send_text("order").await?;
//! let message = queue.receive().await?;
//! # Ok(())
//! # }
//! ```

use crate::address::FormatName;
use crate::error::{Operation, QueueError};
use crate::message::{Message, Priority, QueueName};
use crate::transaction::TransactionMode;
use crate::transport::{AccessMode, ReceiveAction, ReceiveTimeout, TransportSession};
use async_trait::async_trait;
use bytes::Bytes;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;

// ============================================================================
// Access Markers
// ============================================================================

mod sealed {
    pub trait Sealed {}
}

/// Access mode a handle type was opened with
pub trait Access: sealed::Sealed + Send + Sync + 'static {
    const MODE: AccessMode;
}

/// Marker for handle types that may send
pub trait CanSend: Access {}

/// Marker for handle types that may receive and peek
pub trait CanReceive: Access {}

/// Handle opened for sending only
#[derive(Debug)]
pub enum SendOnly {}

/// Handle opened for receiving and peeking only
#[derive(Debug)]
pub enum ReceiveOnly {}

/// Handle opened for both directions
#[derive(Debug)]
pub enum SendAndReceive {}

impl sealed::Sealed for SendOnly {}
impl sealed::Sealed for ReceiveOnly {}
impl sealed::Sealed for SendAndReceive {}

impl Access for SendOnly {
    const MODE: AccessMode = AccessMode::Send;
}

impl Access for ReceiveOnly {
    const MODE: AccessMode = AccessMode::Receive;
}

impl Access for SendAndReceive {
    const MODE: AccessMode = AccessMode::SendAndReceive;
}

impl CanSend for SendOnly {}
impl CanSend for SendAndReceive {}
impl CanReceive for ReceiveOnly {}
impl CanReceive for SendAndReceive {}

/// Send-only queue handle
pub type Sender = QueueHandle<SendOnly>;

/// Receive-only queue handle
pub type Receiver = QueueHandle<ReceiveOnly>;

/// Queue handle that can send and receive
pub type SenderReceiver = QueueHandle<SendAndReceive>;

// ============================================================================
// Send Options
// ============================================================================

/// Options applied to a single send
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Overrides the message's own priority when set
    pub priority: Option<Priority>,
    /// Transaction the send takes part in
    pub transaction: TransactionMode,
}

impl SendOptions {
    /// Create new send options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Send with high (`true`) or normal (`false`) priority
    pub fn with_high_priority(mut self, high_priority: bool) -> Self {
        self.priority = Some(Priority::from_flag(high_priority));
        self
    }

    /// Set the transaction mode
    pub fn with_transaction(mut self, transaction: TransactionMode) -> Self {
        self.transaction = transaction;
        self
    }
}

// ============================================================================
// Capability Traits
// ============================================================================

/// Capability to put messages on a queue
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a message with explicit priority and transaction settings
    async fn send_with_options(
        &self,
        message: &Message,
        options: SendOptions,
    ) -> Result<(), QueueError>;

    /// Send a message at its own priority, outside any transaction
    async fn send(&self, message: &Message) -> Result<(), QueueError> {
        self.send_with_options(message, SendOptions::default())
            .await
    }

    /// Send a message with the given priority flag, outside any transaction
    async fn send_with_priority(
        &self,
        message: &Message,
        high_priority: bool,
    ) -> Result<(), QueueError> {
        self.send_with_options(message, SendOptions::new().with_high_priority(high_priority))
            .await
    }

    /// Send a message at normal priority in the given transaction mode
    async fn send_in_transaction(
        &self,
        message: &Message,
        transaction: TransactionMode,
    ) -> Result<(), QueueError> {
        let options = SendOptions::new()
            .with_high_priority(false)
            .with_transaction(transaction);
        self.send_with_options(message, options).await
    }

    /// Send raw bytes with an empty label and no correlation id
    async fn send_bytes(&self, body: Bytes) -> Result<(), QueueError> {
        self.send(&Message::new(body)).await
    }

    /// Send the UTF-8 encoding of `text` with an empty label and no correlation id
    async fn send_text(&self, text: &str) -> Result<(), QueueError> {
        self.send(&Message::from_text(text)).await
    }
}

/// Capability to take or inspect messages on a queue
#[async_trait]
pub trait MessageReceiver: Send + Sync {
    /// Fetch the message at the head of the queue.
    ///
    /// Blocks for up to `timeout`; an expired wait fails with an
    /// I/O-timeout error.
    async fn fetch(
        &self,
        timeout: ReceiveTimeout,
        action: ReceiveAction,
    ) -> Result<Message, QueueError>;

    /// Remove and return the next message, waiting as long as it takes
    async fn receive(&self) -> Result<Message, QueueError> {
        self.fetch(ReceiveTimeout::Infinite, ReceiveAction::Receive)
            .await
    }

    /// Remove and return the next message, waiting at most `timeout`.
    ///
    /// A zero `timeout` waits forever, like a timeout of `0` milliseconds.
    async fn receive_timeout(&self, timeout: Duration) -> Result<Message, QueueError> {
        self.fetch(ReceiveTimeout::from(timeout), ReceiveAction::Receive)
            .await
    }

    /// Return the next message without removing it, waiting as long as it takes
    async fn peek(&self) -> Result<Message, QueueError> {
        self.fetch(ReceiveTimeout::Infinite, ReceiveAction::PeekCurrent)
            .await
    }

    /// Return the next message without removing it, waiting at most `timeout`.
    ///
    /// A zero `timeout` waits forever.
    async fn peek_timeout(&self, timeout: Duration) -> Result<Message, QueueError> {
        self.fetch(ReceiveTimeout::from(timeout), ReceiveAction::PeekCurrent)
            .await
    }
}

// ============================================================================
// QueueHandle
// ============================================================================

/// An opened queue bound to one access mode
pub struct QueueHandle<A: Access> {
    name: QueueName,
    format_name: Option<FormatName>,
    label: Option<String>,
    transactional: Option<bool>,
    session: Mutex<Option<Box<dyn TransportSession>>>,
    _access: PhantomData<A>,
}

impl<A: Access> QueueHandle<A> {
    /// Wrap a freshly opened session.
    ///
    /// The transport does not report a queue's format name, label, or
    /// transactional setting on open, so they start unresolved.
    pub(crate) fn opened(name: QueueName, session: Box<dyn TransportSession>) -> Self {
        Self {
            name,
            format_name: None,
            label: None,
            transactional: None,
            session: Mutex::new(Some(session)),
            _access: PhantomData,
        }
    }

    /// Record the properties the caller supplied when creating the queue
    pub(crate) fn with_creation_properties(mut self, label: String, transactional: bool) -> Self {
        self.label = Some(label);
        self.transactional = Some(transactional);
        self
    }

    /// Name or path the handle was opened with
    pub fn name(&self) -> &QueueName {
        &self.name
    }

    /// Resolved format name, `None` while unresolved
    pub fn format_name(&self) -> Option<&FormatName> {
        self.format_name.as_ref()
    }

    /// Queue label, known only for handles returned by queue creation
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Transactional setting, known only for handles returned by queue creation
    pub fn is_transactional(&self) -> Option<bool> {
        self.transactional
    }

    /// Access mode the handle was opened with
    pub fn access_mode(&self) -> AccessMode {
        A::MODE
    }

    /// Check if the handle has been closed
    pub async fn is_closed(&self) -> bool {
        self.session.lock().await.is_none()
    }

    /// Close the handle.
    ///
    /// The session is released whether or not the transport reports success;
    /// afterwards every operation, including another close, fails with an
    /// invalid-handle error.
    pub async fn close(&self) -> Result<(), QueueError> {
        let mut guard = self.session.lock().await;
        let mut session = guard.take().ok_or_else(|| QueueError::closed(Operation::Close))?;
        drop(guard);

        let status = session.close().await;
        debug!(queue = %self.name, status = %status, "Closed queue handle");
        status.check(Operation::Close)
    }
}

impl<A: Access> std::fmt::Debug for QueueHandle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueHandle")
            .field("name", &self.name)
            .field("access_mode", &A::MODE)
            .field("format_name", &self.format_name)
            .field("label", &self.label)
            .field("transactional", &self.transactional)
            .finish_non_exhaustive()
    }
}

impl<A: Access> Drop for QueueHandle<A> {
    fn drop(&mut self) {
        if self.session.get_mut().take().is_some() {
            warn!(queue = %self.name, "Queue handle dropped without close; session released");
        }
    }
}

#[async_trait]
impl<A: CanSend> MessageSender for QueueHandle<A> {
    async fn send_with_options(
        &self,
        message: &Message,
        options: SendOptions,
    ) -> Result<(), QueueError> {
        message.validate()?;
        let priority = options.priority.unwrap_or(message.priority);

        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or_else(|| QueueError::closed(Operation::Send))?;

        let status = session
            .send_bytes(
                &message.body,
                &message.label,
                message.correlation_id.as_ref(),
                &options.transaction,
                priority,
            )
            .await;

        debug!(
            queue = %self.name,
            bytes = message.body.len(),
            priority = ?priority,
            transaction = %options.transaction,
            status = %status,
            "Sent message"
        );
        status.check(Operation::Send)
    }
}

#[async_trait]
impl<A: CanReceive> MessageReceiver for QueueHandle<A> {
    async fn fetch(
        &self,
        timeout: ReceiveTimeout,
        action: ReceiveAction,
    ) -> Result<Message, QueueError> {
        let mut guard = self.session.lock().await;
        let session = guard
            .as_mut()
            .ok_or_else(|| QueueError::closed(Operation::Receive))?;

        let mut message = Message::empty();
        let status = session.receive_bytes(&mut message, timeout, action).await;

        debug!(
            queue = %self.name,
            action = ?action,
            timeout = ?timeout,
            status = %status,
            "Fetched message"
        );
        status.check(Operation::Receive)?;
        Ok(message)
    }
}
