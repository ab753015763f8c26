//! The narrow primitive surface consumed from the underlying queuing service.
//!
//! Every primitive reports its outcome as a [`StatusCode`]; `0` is success.
//! Implementations own storage, delivery, and blocking. The client layer
//! converts nonzero statuses into typed errors at the call site and never
//! retries.

use crate::message::{CorrelationId, Message, Priority};
use crate::status::StatusCode;
use crate::transaction::TransactionMode;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;

/// Access granted to a transport session when it is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Receive,
    Send,
    SendAndReceive,
}

impl AccessMode {
    /// Numeric access flag
    pub fn value(&self) -> u32 {
        match self {
            Self::Receive => 1,
            Self::Send => 2,
            Self::SendAndReceive => 3,
        }
    }

    pub fn can_send(&self) -> bool {
        matches!(self, Self::Send | Self::SendAndReceive)
    }

    pub fn can_receive(&self) -> bool {
        matches!(self, Self::Receive | Self::SendAndReceive)
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Receive => f.write_str("receive"),
            Self::Send => f.write_str("send"),
            Self::SendAndReceive => f.write_str("send+receive"),
        }
    }
}

/// How long a receive or peek may block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReceiveTimeout {
    /// Block until a message arrives
    #[default]
    Infinite,
    /// Block for at most this long, then fail with an I/O timeout
    After(Duration),
}

impl ReceiveTimeout {
    /// Build a timeout from milliseconds; `0` means wait forever
    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            Self::Infinite
        } else {
            Self::After(Duration::from_millis(millis))
        }
    }

    /// Get the finite duration, `None` when infinite
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Infinite => None,
            Self::After(duration) => Some(*duration),
        }
    }

    /// Instant at which a wait that began at `start` gives up.
    ///
    /// `None` means the wait never expires, either because the timeout is
    /// infinite or because the deadline lies beyond what `Instant` can hold.
    pub fn deadline(&self, start: Instant) -> Option<Instant> {
        self.duration()
            .and_then(|duration| start.checked_add(duration))
    }
}

/// A zero duration is the infinite-wait sentinel, as in [`ReceiveTimeout::from_millis`]
impl From<Duration> for ReceiveTimeout {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Self::Infinite
        } else {
            Self::After(duration)
        }
    }
}

/// Whether a fetch removes the message or leaves it in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiveAction {
    /// Remove the message from the queue
    Receive,
    /// Read the message at the head of the queue without removing it
    PeekCurrent,
}

/// Process-wide entry point to the queuing service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bind to the underlying service.
    ///
    /// Called once per transport before any other primitive. Implementations
    /// must tolerate repeated calls.
    async fn initialize(&self) -> StatusCode {
        StatusCode::SUCCESS
    }

    /// Create a queue at `path`
    async fn create_queue(&self, path: &str, label: &str, transactional: bool) -> StatusCode;

    /// Delete the queue at `path`
    async fn delete_queue(&self, path: &str) -> StatusCode;

    /// Open a session that may only receive and peek
    async fn open_for_receive(
        &self,
        address: &str,
    ) -> Result<Box<dyn TransportSession>, StatusCode>;

    /// Open a session that may only send
    async fn open_for_send(&self, address: &str) -> Result<Box<dyn TransportSession>, StatusCode>;

    /// Open a session that may send, receive, and peek
    async fn open_for_send_and_receive(
        &self,
        address: &str,
    ) -> Result<Box<dyn TransportSession>, StatusCode>;

    /// Short name used in log output
    fn name(&self) -> &'static str;
}

/// An open session bound to one queue.
///
/// Dropping a session releases whatever it holds, whether or not
/// [`TransportSession::close`] was called.
#[async_trait]
pub trait TransportSession: Send {
    /// Enqueue one message
    async fn send_bytes(
        &mut self,
        body: &[u8],
        label: &str,
        correlation_id: Option<&CorrelationId>,
        transaction: &TransactionMode,
        priority: Priority,
    ) -> StatusCode;

    /// Fill `target` with the message at the head of the queue.
    ///
    /// Blocks until a message is available or `timeout` elapses; on expiry the
    /// status is [`StatusCode::IO_TIMEOUT`] and `target` is left untouched.
    async fn receive_bytes(
        &mut self,
        target: &mut Message,
        timeout: ReceiveTimeout,
        action: ReceiveAction,
    ) -> StatusCode;

    /// Release the session
    async fn close(&mut self) -> StatusCode;
}
