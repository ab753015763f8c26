//! # MQ Client
//!
//! Handle-based client for named, persistent message queues.
//!
//! This library provides:
//! - Queue creation, deletion, and path-to-address resolution
//! - Queue handles typed by access mode (send, receive, or both)
//! - Blocking receive and peek with finite or infinite timeouts
//! - Message priority, labels, and correlation ids
//! - A total mapping from transport status codes to failure categories
//!
//! The queuing service itself sits behind the [`Transport`] trait. Two
//! implementations ship with the crate: [`InMemoryTransport`] for tests and
//! single-process use, and [`FileSystemTransport`] for queues shared between
//! processes on one machine.
//!
//! ## Module Organization
//!
//! - [`status`] - Status codes and failure categories
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Message envelope and identifiers
//! - [`transaction`] - Transaction modes for sends
//! - [`address`] - Direct format names
//! - [`transport`] - The transport boundary traits
//! - [`handle`] - Open queue handles and capability traits
//! - [`admin`] - Queue management and handle construction
//! - [`config`] - Client and transport configuration
//! - [`transports`] - Transport implementations
//!
//! ## Example
//!
//! ```
//! use mq_client::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let admin = QueueAdmin::from_config(&ClientConfig::default()).await?;
//! let queue = admin.create(r".\private$\orders", "Orders", false).await?;
//!
//! queue.send(&Message::from_text("hello").with_label("greeting")).await?;
//! let message = queue.receive_timeout(std::time::Duration::from_secs(1)).await?;
//! assert_eq!(message.body_text()?, "hello");
//!
//! queue.close().await?;
//! # Ok::<(), QueueError>(())
//! # }).unwrap();
//! ```

pub mod address;
pub mod admin;
pub mod config;
pub mod error;
pub mod handle;
pub mod message;
pub mod status;
pub mod transaction;
pub mod transport;
pub mod transports;

// Re-export commonly used types at crate root for convenience
pub use address::{AddressScheme, FormatName};
pub use admin::QueueAdmin;
pub use config::{ClientConfig, FileSystemConfig, InMemoryConfig, TransportConfig};
pub use error::{ConfigurationError, Operation, QueueError, SerializationError, ValidationError};
pub use handle::{
    Access, CanReceive, CanSend, MessageReceiver, MessageSender, QueueHandle, ReceiveOnly,
    Receiver, SendAndReceive, SendOnly, SendOptions, Sender, SenderReceiver,
};
pub use message::{
    CorrelationId, Message, Priority, QueueName, Timestamp, CORRELATION_ID_SIZE,
    MAX_MESSAGE_LABEL_LEN, MAX_QUEUE_LABEL_LEN,
};
pub use status::{FailureCategory, StatusCode};
pub use transaction::{Coordinator, TransactionContext, TransactionMode};
pub use transport::{AccessMode, ReceiveAction, ReceiveTimeout, Transport, TransportSession};
pub use transports::{FileSystemTransport, InMemoryTransport};

/// Types needed by most queue consumers, including the capability traits
pub mod prelude {
    pub use crate::{
        ClientConfig, CorrelationId, FailureCategory, Message, MessageReceiver, MessageSender,
        Priority, QueueAdmin, QueueError, QueueHandle, ReceiveOnly, ReceiveTimeout, Receiver,
        SendAndReceive, SendOnly, Sender, SenderReceiver, TransactionMode,
    };
}
