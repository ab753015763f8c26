//! In-memory transport implementation for testing and development.
//!
//! This module provides a process-local transport that:
//! - Keeps queues in shared memory, keyed by case-insensitive path
//! - Delivers high-priority messages first, FIFO within a priority
//! - Blocks receivers on a per-queue notifier until a message or the deadline arrives
//! - Reports failures through the same status codes as a real service
//!
//! This transport is intended for:
//! - Unit testing of queue consumers
//! - Development and prototyping
//! - Reference behavior for other transports

use crate::address::queue_path_from_address;
use crate::config::InMemoryConfig;
use crate::message::{CorrelationId, Message, Priority, Timestamp};
use crate::status::StatusCode;
use crate::transaction::TransactionMode;
use crate::transport::{
    AccessMode, ReceiveAction, ReceiveTimeout, Transport, TransportSession,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// Status reported when a queue already holds its configured maximum
const QUEUE_FULL: StatusCode = StatusCode::new(0xC00E_0027);

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Thread-safe storage for all queues
struct QueueStorage {
    queues: HashMap<String, Arc<InMemoryQueue>>,
}

/// Internal queue state for a single queue
struct InMemoryQueue {
    path: String,
    label: String,
    transactional: bool,
    max_size: usize,
    state: Mutex<QueueState>,
    arrivals: Notify,
}

struct QueueState {
    /// Pending messages ordered by priority, then arrival
    messages: BTreeMap<(Reverse<u8>, u64), StoredMessage>,
    next_sequence: u64,
    deleted: bool,
}

/// A message stored in the queue with metadata
#[derive(Clone)]
struct StoredMessage {
    body: Bytes,
    label: String,
    correlation_id: Option<CorrelationId>,
    priority: Priority,
    arrived_at: Timestamp,
}

impl StoredMessage {
    fn fill(self, target: &mut Message) {
        target.body = self.body;
        target.label = self.label;
        target.correlation_id = self.correlation_id;
        target.priority = self.priority;
        target.arrived_at = Some(self.arrived_at);
    }
}

fn queue_key(path: &str) -> String {
    path.to_lowercase()
}

// ============================================================================
// InMemoryTransport
// ============================================================================

/// In-memory transport implementation
pub struct InMemoryTransport {
    storage: Arc<RwLock<QueueStorage>>,
    config: InMemoryConfig,
    open_sessions: Arc<AtomicUsize>,
}

impl InMemoryTransport {
    /// Create new in-memory transport with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            storage: Arc::new(RwLock::new(QueueStorage {
                queues: HashMap::new(),
            })),
            config,
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of sessions currently open across all queues
    pub fn open_session_count(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Number of messages waiting on the queue at `path`, `None` if it does not exist
    pub fn message_count(&self, path: &str) -> Option<usize> {
        let storage = self.storage.read().ok()?;
        let queue = storage.queues.get(&queue_key(path))?;
        let state = queue.state.lock().ok()?;
        Some(state.messages.len())
    }

    /// Label and transactional flag the queue at `path` was created with
    pub fn queue_properties(&self, path: &str) -> Option<(String, bool)> {
        let storage = self.storage.read().ok()?;
        let queue = storage.queues.get(&queue_key(path))?;
        Some((queue.label.clone(), queue.transactional))
    }

    fn open(
        &self,
        address: &str,
        access: AccessMode,
    ) -> Result<Box<dyn TransportSession>, StatusCode> {
        let path = queue_path_from_address(address)?;
        let storage = self
            .storage
            .read()
            .map_err(|_| StatusCode::SERVICE_NOT_AVAILABLE)?;
        let queue = storage
            .queues
            .get(&queue_key(&path))
            .cloned()
            .ok_or(StatusCode::QUEUE_NOT_FOUND)?;

        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        debug!(queue = %queue.path, access = %access, "Opened in-memory session");

        Ok(Box::new(InMemorySession {
            queue,
            access,
            open_sessions: Arc::clone(&self.open_sessions),
            released: false,
        }))
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn create_queue(&self, path: &str, label: &str, transactional: bool) -> StatusCode {
        if path.is_empty() {
            return StatusCode::ILLEGAL_QUEUE_PATHNAME;
        }

        let mut storage = match self.storage.write() {
            Ok(storage) => storage,
            Err(_) => return StatusCode::SERVICE_NOT_AVAILABLE,
        };

        let key = queue_key(path);
        if storage.queues.contains_key(&key) {
            return StatusCode::QUEUE_EXISTS;
        }

        storage.queues.insert(
            key,
            Arc::new(InMemoryQueue {
                path: path.to_string(),
                label: label.to_string(),
                transactional,
                max_size: self.config.max_queue_size,
                state: Mutex::new(QueueState {
                    messages: BTreeMap::new(),
                    next_sequence: 0,
                    deleted: false,
                }),
                arrivals: Notify::new(),
            }),
        );
        StatusCode::SUCCESS
    }

    async fn delete_queue(&self, path: &str) -> StatusCode {
        let removed = match self.storage.write() {
            Ok(mut storage) => storage.queues.remove(&queue_key(path)),
            Err(_) => return StatusCode::SERVICE_NOT_AVAILABLE,
        };

        let Some(queue) = removed else {
            return StatusCode::QUEUE_NOT_FOUND;
        };

        if let Ok(mut state) = queue.state.lock() {
            state.deleted = true;
            state.messages.clear();
        }
        // Wake blocked receivers so they observe the deletion.
        queue.arrivals.notify_waiters();
        StatusCode::SUCCESS
    }

    async fn open_for_receive(
        &self,
        address: &str,
    ) -> Result<Box<dyn TransportSession>, StatusCode> {
        self.open(address, AccessMode::Receive)
    }

    async fn open_for_send(&self, address: &str) -> Result<Box<dyn TransportSession>, StatusCode> {
        self.open(address, AccessMode::Send)
    }

    async fn open_for_send_and_receive(
        &self,
        address: &str,
    ) -> Result<Box<dyn TransportSession>, StatusCode> {
        self.open(address, AccessMode::SendAndReceive)
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

// ============================================================================
// InMemorySession
// ============================================================================

/// Session bound to one in-memory queue
struct InMemorySession {
    queue: Arc<InMemoryQueue>,
    access: AccessMode,
    open_sessions: Arc<AtomicUsize>,
    released: bool,
}

impl InMemorySession {
    fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
        true
    }

    /// Take or copy the head message, `Err` when no message can be delivered
    fn try_fetch(&self, action: ReceiveAction) -> Result<Option<StoredMessage>, StatusCode> {
        let mut state = self
            .queue
            .state
            .lock()
            .map_err(|_| StatusCode::SERVICE_NOT_AVAILABLE)?;
        if state.deleted {
            return Err(StatusCode::QUEUE_DELETED);
        }

        let next = match action {
            ReceiveAction::Receive => state.messages.pop_first().map(|(_, stored)| stored),
            ReceiveAction::PeekCurrent => state.messages.values().next().cloned(),
        };
        Ok(next)
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl TransportSession for InMemorySession {
    async fn send_bytes(
        &mut self,
        body: &[u8],
        label: &str,
        correlation_id: Option<&CorrelationId>,
        transaction: &TransactionMode,
        priority: Priority,
    ) -> StatusCode {
        if self.released {
            return StatusCode::INVALID_HANDLE;
        }
        if !self.access.can_send() {
            return StatusCode::ACCESS_DENIED;
        }

        let mut state = match self.queue.state.lock() {
            Ok(state) => state,
            Err(_) => return StatusCode::SERVICE_NOT_AVAILABLE,
        };
        if state.deleted {
            return StatusCode::QUEUE_DELETED;
        }
        if state.messages.len() >= self.queue.max_size {
            return QUEUE_FULL;
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.messages.insert(
            (Reverse(priority.level()), sequence),
            StoredMessage {
                body: Bytes::copy_from_slice(body),
                label: label.to_string(),
                correlation_id: correlation_id.cloned(),
                priority,
                arrived_at: Timestamp::now(),
            },
        );
        drop(state);

        debug!(
            queue = %self.queue.path,
            transaction = transaction.value(),
            sequence,
            "Enqueued message"
        );
        self.queue.arrivals.notify_waiters();
        StatusCode::SUCCESS
    }

    async fn receive_bytes(
        &mut self,
        target: &mut Message,
        timeout: ReceiveTimeout,
        action: ReceiveAction,
    ) -> StatusCode {
        if self.released {
            return StatusCode::INVALID_HANDLE;
        }
        if !self.access.can_receive() {
            return StatusCode::ACCESS_DENIED;
        }

        let deadline = timeout.deadline(Instant::now());
        let queue = Arc::clone(&self.queue);

        loop {
            // Register for wake-ups before looking, so an arrival between the
            // check and the wait is not missed.
            let arrival = queue.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            match self.try_fetch(action) {
                Ok(Some(stored)) => {
                    stored.fill(target);
                    return StatusCode::SUCCESS;
                }
                Ok(None) => {}
                Err(status) => return status,
            }

            match deadline {
                None => arrival.await,
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, arrival).await.is_err() {
                        return StatusCode::IO_TIMEOUT;
                    }
                }
            }
        }
    }

    async fn close(&mut self) -> StatusCode {
        if self.release() {
            StatusCode::SUCCESS
        } else {
            StatusCode::INVALID_HANDLE
        }
    }
}
