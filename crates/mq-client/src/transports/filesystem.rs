//! # File-System Transport
//!
//! Local directory implementation of the transport boundary, shared between
//! processes on one machine.
//!
//! Layout under the configured root:
//!
//! ```text
//! <root>/<url-encoded lowercase queue path>/queue.json
//! <root>/<url-encoded lowercase queue path>/messages/<priority>-<micros>-<seq>-<id>.json
//! ```
//!
//! Message file names sort by priority and then enqueue time. A receive
//! claims a file by renaming it before reading, so two receivers never get
//! the same message. Blocked receives rescan the directory at the configured
//! poll interval.

use crate::address::queue_path_from_address;
use crate::config::FileSystemConfig;
use crate::message::{CorrelationId, Message, Priority, Timestamp};
use crate::status::StatusCode;
use crate::transaction::TransactionMode;
use crate::transport::{
    AccessMode, ReceiveAction, ReceiveTimeout, Transport, TransportSession,
};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "filesystem_tests.rs"]
mod tests;

const QUEUE_METADATA_FILE: &str = "queue.json";
const MESSAGES_DIR: &str = "messages";
const MESSAGE_EXTENSION: &str = "json";

/// Properties recorded when a queue directory is created
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueueMetadata {
    path: String,
    label: String,
    transactional: bool,
    created_at: Timestamp,
    /// Distinguishes a re-created queue from the one a session opened
    incarnation: String,
}

/// File-system based transport implementation
#[derive(Debug, Clone)]
pub struct FileSystemTransport {
    root: PathBuf,
    poll_interval: Duration,
    sequence: Arc<AtomicU64>,
}

impl FileSystemTransport {
    /// Create new file-system transport.
    ///
    /// The root directory is created by [`Transport::initialize`].
    pub fn new(config: FileSystemConfig) -> Self {
        Self {
            root: config.root,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Directory holding all queues
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the directory for a queue path
    fn queue_dir(&self, path: &str) -> Result<PathBuf, StatusCode> {
        let encoded = urlencoding::encode(&path.to_lowercase()).into_owned();
        if encoded.is_empty() || encoded == "." || encoded == ".." {
            return Err(StatusCode::ILLEGAL_QUEUE_PATHNAME);
        }
        Ok(self.root.join(encoded))
    }

    async fn open(
        &self,
        address: &str,
        access: AccessMode,
    ) -> Result<Box<dyn TransportSession>, StatusCode> {
        let path = queue_path_from_address(address)?;
        let queue_dir = self.queue_dir(&path)?;
        let metadata = read_metadata(&queue_dir)
            .await?
            .ok_or(StatusCode::QUEUE_NOT_FOUND)?;

        debug!(queue = %metadata.path, access = %access, "Opened file-system session");
        Ok(Box::new(FileSystemSession {
            queue_dir,
            incarnation: metadata.incarnation,
            access,
            poll_interval: self.poll_interval,
            sequence: Arc::clone(&self.sequence),
            released: false,
        }))
    }
}

#[async_trait]
impl Transport for FileSystemTransport {
    async fn initialize(&self) -> StatusCode {
        match fs::create_dir_all(&self.root).await {
            Ok(()) => StatusCode::SUCCESS,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Failed to create queue root");
                io_status(&e)
            }
        }
    }

    async fn create_queue(&self, path: &str, label: &str, transactional: bool) -> StatusCode {
        let queue_dir = match self.queue_dir(path) {
            Ok(dir) => dir,
            Err(status) => return status,
        };

        let metadata = QueueMetadata {
            path: path.to_string(),
            label: label.to_string(),
            transactional,
            created_at: Timestamp::now(),
            incarnation: uuid::Uuid::new_v4().to_string(),
        };
        let json = match serde_json::to_vec_pretty(&metadata) {
            Ok(json) => json,
            Err(_) => return StatusCode::INVALID_PARAMETER,
        };

        match fs::create_dir(&queue_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return StatusCode::QUEUE_EXISTS,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return StatusCode::SERVICE_NOT_AVAILABLE
            }
            Err(e) => return io_status(&e),
        }

        if let Err(e) = populate_queue_dir(&queue_dir, &json).await {
            warn!(queue = %path, error = %e, "Failed to set up queue directory");
            // Leave no queue directory without metadata behind.
            if let Err(cleanup) = fs::remove_dir_all(&queue_dir).await {
                warn!(dir = %queue_dir.display(), error = %cleanup, "Failed to remove partial queue");
            }
            return io_status(&e);
        }

        StatusCode::SUCCESS
    }

    async fn delete_queue(&self, path: &str) -> StatusCode {
        let queue_dir = match self.queue_dir(path) {
            Ok(dir) => dir,
            Err(status) => return status,
        };

        match fs::remove_dir_all(&queue_dir).await {
            Ok(()) => StatusCode::SUCCESS,
            Err(e) if e.kind() == ErrorKind::NotFound => StatusCode::QUEUE_NOT_FOUND,
            Err(e) => io_status(&e),
        }
    }

    async fn open_for_receive(
        &self,
        address: &str,
    ) -> Result<Box<dyn TransportSession>, StatusCode> {
        self.open(address, AccessMode::Receive).await
    }

    async fn open_for_send(&self, address: &str) -> Result<Box<dyn TransportSession>, StatusCode> {
        self.open(address, AccessMode::Send).await
    }

    async fn open_for_send_and_receive(
        &self,
        address: &str,
    ) -> Result<Box<dyn TransportSession>, StatusCode> {
        self.open(address, AccessMode::SendAndReceive).await
    }

    fn name(&self) -> &'static str {
        "file-system"
    }
}

// ============================================================================
// FileSystemSession
// ============================================================================

/// Session bound to one queue directory
struct FileSystemSession {
    queue_dir: PathBuf,
    incarnation: String,
    access: AccessMode,
    poll_interval: Duration,
    sequence: Arc<AtomicU64>,
    released: bool,
}

impl FileSystemSession {
    fn messages_dir(&self) -> PathBuf {
        self.queue_dir.join(MESSAGES_DIR)
    }

    /// Check that the queue this session opened still exists
    async fn ensure_queue(&self) -> Result<(), StatusCode> {
        match read_metadata(&self.queue_dir).await? {
            Some(metadata) if metadata.incarnation == self.incarnation => Ok(()),
            _ => Err(StatusCode::QUEUE_DELETED),
        }
    }

    fn message_file_name(&self, priority: Priority) -> String {
        let micros = chrono::Utc::now().timestamp_micros().max(0);
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!(
            "{}-{:020}-{:010}-{}.{}",
            9 - priority.level(),
            micros,
            sequence,
            uuid::Uuid::new_v4().simple(),
            MESSAGE_EXTENSION
        )
    }

    /// List pending message files in delivery order
    async fn pending(&self) -> Result<Vec<PathBuf>, StatusCode> {
        let mut read_dir = match fs::read_dir(self.messages_dir()).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StatusCode::QUEUE_DELETED),
            Err(e) => return Err(io_status(&e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| io_status(&e))? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some(MESSAGE_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Take or copy the head message, `None` when the queue is empty.
    ///
    /// A receive that claims a file but cannot deliver it puts the file back
    /// under its original name.
    async fn try_fetch(&self, action: ReceiveAction) -> Result<Option<Message>, StatusCode> {
        self.ensure_queue().await?;

        for file in self.pending().await? {
            if action == ReceiveAction::PeekCurrent {
                let json = match fs::read(&file).await {
                    Ok(json) => json,
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(io_status(&e)),
                };
                return parse_message(&json).map(Some);
            }

            let claimed = file.with_extension(format!(
                "claimed-{}",
                uuid::Uuid::new_v4().simple()
            ));
            match fs::rename(&file, &claimed).await {
                Ok(()) => {}
                // Another receiver got there first.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(io_status(&e)),
            }

            let parsed = match fs::read(&claimed).await {
                Ok(json) => parse_message(&json),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => Err(io_status(&e)),
            };
            let message = match parsed {
                Ok(message) => message,
                Err(status) => {
                    release_claim(&claimed, &file).await;
                    return Err(status);
                }
            };

            if let Err(e) = fs::remove_file(&claimed).await {
                warn!(file = %claimed.display(), error = %e, "Failed to remove claimed message");
            }
            return Ok(Some(message));
        }

        Ok(None)
    }
}

#[async_trait]
impl TransportSession for FileSystemSession {
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
        if let Err(status) = self.ensure_queue().await {
            return status;
        }

        let stored = Message {
            body: Bytes::copy_from_slice(body),
            label: label.to_string(),
            correlation_id: correlation_id.cloned(),
            priority,
            arrived_at: Some(Timestamp::now()),
        };
        let json = match serde_json::to_vec(&stored) {
            Ok(json) => json,
            Err(_) => return StatusCode::PROPERTY,
        };

        let file = self.messages_dir().join(self.message_file_name(priority));
        match write_atomic(&file, &json).await {
            Ok(()) => {
                debug!(
                    file = %file.display(),
                    transaction = transaction.value(),
                    "Wrote message file"
                );
                StatusCode::SUCCESS
            }
            Err(e) if e.kind() == ErrorKind::NotFound => StatusCode::QUEUE_DELETED,
            Err(e) => io_status(&e),
        }
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
        loop {
            match self.try_fetch(action).await {
                Ok(Some(message)) => {
                    *target = message;
                    return StatusCode::SUCCESS;
                }
                Ok(None) => {}
                Err(status) => return status,
            }

            let wait = match deadline {
                None => self.poll_interval,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return StatusCode::IO_TIMEOUT;
                    }
                    self.poll_interval.min(deadline - now)
                }
            };
            tokio::time::sleep(wait).await;
        }
    }

    async fn close(&mut self) -> StatusCode {
        if self.released {
            return StatusCode::INVALID_HANDLE;
        }
        self.released = true;
        StatusCode::SUCCESS
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn read_metadata(queue_dir: &Path) -> Result<Option<QueueMetadata>, StatusCode> {
    match fs::read(queue_dir.join(QUEUE_METADATA_FILE)).await {
        Ok(json) => serde_json::from_slice(&json)
            .map(Some)
            .map_err(|_| StatusCode::PROPERTY),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_status(&e)),
    }
}

/// Create the messages directory and the metadata file of a new queue
async fn populate_queue_dir(queue_dir: &Path, metadata: &[u8]) -> std::io::Result<()> {
    fs::create_dir(queue_dir.join(MESSAGES_DIR)).await?;
    write_atomic(&queue_dir.join(QUEUE_METADATA_FILE), metadata).await
}

fn parse_message(json: &[u8]) -> Result<Message, StatusCode> {
    serde_json::from_slice(json).map_err(|_| StatusCode::PROPERTY)
}

/// Return a claimed message file to the queue
async fn release_claim(claimed: &Path, original: &Path) {
    if let Err(e) = fs::rename(claimed, original).await {
        warn!(file = %claimed.display(), error = %e, "Failed to return claimed message");
    }
}

/// Write to a temporary file, then rename into place
async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}

fn io_status(error: &std::io::Error) -> StatusCode {
    match error.kind() {
        ErrorKind::PermissionDenied => StatusCode::ACCESS_DENIED,
        ErrorKind::NotFound => StatusCode::QUEUE_NOT_FOUND,
        _ => StatusCode::SERVICE_NOT_AVAILABLE,
    }
}
