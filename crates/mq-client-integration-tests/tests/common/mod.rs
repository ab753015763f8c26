//! Common test utilities for mq-client integration tests
//!
//! This module provides:
//! - Admin fixtures over the in-memory and file-system transports
//! - Unique queue path generation
//! - Small message helpers

use mq_client::{
    FileSystemConfig, FileSystemTransport, InMemoryTransport, Message, QueueAdmin,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Admin over a fresh in-memory transport, plus the transport for inspection
#[allow(dead_code)]
pub fn in_memory_admin() -> (QueueAdmin, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::default());
    (QueueAdmin::new(transport.clone()), transport)
}

/// Admin over a file-system transport rooted in a new temporary directory.
///
/// The directory is removed when the returned guard is dropped.
#[allow(dead_code)]
pub fn file_system_admin() -> (QueueAdmin, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let admin = file_system_admin_at(&dir);
    (admin, dir)
}

/// Additional admin sharing the queues under `dir`
#[allow(dead_code)]
pub fn file_system_admin_at(dir: &TempDir) -> QueueAdmin {
    let config = FileSystemConfig {
        root: dir.path().join("queues"),
        poll_interval_ms: 5,
    };
    QueueAdmin::new(Arc::new(FileSystemTransport::new(config)))
}

/// Private queue path that no other test uses
#[allow(dead_code)]
pub fn unique_queue(prefix: &str) -> String {
    format!(r".\private$\{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Body of a received message as text
#[allow(dead_code)]
pub fn text(message: &Message) -> &str {
    message.body_text().expect("UTF-8 body")
}
