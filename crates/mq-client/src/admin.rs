//! Queue management and handle construction.

use crate::address::FormatName;
use crate::config::{ClientConfig, TransportConfig};
use crate::error::{ConfigurationError, Operation, QueueError, ValidationError};
use crate::handle::{Access, QueueHandle, SendAndReceive, SenderReceiver};
use crate::message::{QueueName, MAX_QUEUE_LABEL_LEN};
use crate::status::StatusCode;
use crate::transport::{AccessMode, Transport, TransportSession};
use crate::transports::{FileSystemTransport, InMemoryTransport};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

#[cfg(test)]
#[path = "admin_tests.rs"]
mod tests;

/// Entry point for creating, deleting, and opening queues.
///
/// Owns a shared reference to the transport and initializes it exactly once,
/// before the first primitive is invoked. Clones share both the transport and
/// its initialization state.
#[derive(Clone)]
pub struct QueueAdmin {
    transport: Arc<dyn Transport>,
    initialized: Arc<OnceCell<()>>,
}

impl QueueAdmin {
    /// Create admin for an existing transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            initialized: Arc::new(OnceCell::new()),
        }
    }

    /// Create admin with the transport selected by configuration
    pub async fn from_config(config: &ClientConfig) -> Result<Self, QueueError> {
        let transport: Arc<dyn Transport> = match &config.transport {
            TransportConfig::InMemory(in_memory) => {
                Arc::new(InMemoryTransport::new(in_memory.clone()))
            }
            TransportConfig::FileSystem(file_system) => {
                Arc::new(FileSystemTransport::new(file_system.clone()))
            }
        };

        let admin = Self::new(transport);
        admin.ensure_initialized().await?;
        Ok(admin)
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Initialize the transport if that has not happened yet
    pub async fn ensure_initialized(&self) -> Result<(), QueueError> {
        self.initialized
            .get_or_try_init(|| async {
                let status = self.transport.initialize().await;
                if status.is_success() {
                    info!(transport = self.transport.name(), "Transport initialized");
                    Ok(())
                } else {
                    Err(QueueError::ConfigurationError(
                        ConfigurationError::TransportInitialization { status },
                    ))
                }
            })
            .await?;
        Ok(())
    }

    /// Create a queue and open it for sending and receiving.
    ///
    /// The returned handle carries the supplied label and transactional
    /// setting. If the open step fails the error is reported as an open
    /// failure; the created queue is left in place.
    pub async fn create(
        &self,
        path: &str,
        label: &str,
        transactional: bool,
    ) -> Result<SenderReceiver, QueueError> {
        let path = QueueName::new(path.to_string())?;
        if label.chars().count() > MAX_QUEUE_LABEL_LEN {
            return Err(ValidationError::OutOfRange {
                field: "queue_label".to_string(),
                message: format!("maximum {} characters", MAX_QUEUE_LABEL_LEN),
            }
            .into());
        }

        self.ensure_initialized().await?;
        let status = self
            .transport
            .create_queue(path.as_str(), label, transactional)
            .await;
        status.check(Operation::Create)?;
        info!(queue = %path, transactional, "Created queue");

        let address = FormatName::for_path(&path).to_string();
        let session = self
            .open_session(AccessMode::SendAndReceive, &address)
            .await?;

        Ok(QueueHandle::<SendAndReceive>::opened(path, session)
            .with_creation_properties(label.to_string(), transactional))
    }

    /// Delete a queue.
    ///
    /// Handles already open on the queue are not touched; the transport
    /// reports later operations on them as queue-deleted failures.
    pub async fn delete(&self, path: &str) -> Result<(), QueueError> {
        let path = QueueName::new(path.to_string())?;
        self.ensure_initialized().await?;

        let status = self.transport.delete_queue(path.as_str()).await;
        status.check(Operation::Delete)?;
        info!(queue = %path, "Deleted queue");
        Ok(())
    }

    /// Resolve a queue path to the direct format name used to open it
    pub fn format_name(path: &str) -> Result<FormatName, ValidationError> {
        let path = QueueName::new(path.to_string())?;
        Ok(FormatName::for_path(&path))
    }

    /// Open an existing queue with the access mode of the handle type `A`
    pub async fn open<A: Access>(&self, name: &str) -> Result<QueueHandle<A>, QueueError> {
        let name = QueueName::new(name.to_string())?;
        self.ensure_initialized().await?;

        let session = self.open_session(A::MODE, name.as_str()).await?;
        Ok(QueueHandle::opened(name, session))
    }

    /// Open an existing queue for sending and receiving
    pub async fn open_default(&self, name: &str) -> Result<SenderReceiver, QueueError> {
        self.open::<SendAndReceive>(name).await
    }

    async fn open_session(
        &self,
        mode: AccessMode,
        address: &str,
    ) -> Result<Box<dyn TransportSession>, QueueError> {
        let opened = match mode {
            AccessMode::Receive => self.transport.open_for_receive(address).await,
            AccessMode::Send => self.transport.open_for_send(address).await,
            AccessMode::SendAndReceive => self.transport.open_for_send_and_receive(address).await,
        };

        match opened {
            Ok(session) => {
                debug!(address, mode = %mode, "Opened queue session");
                Ok(session)
            }
            Err(status) => {
                debug!(address, mode = %mode, status = %status, "Open failed");
                // A failed open must never surface as success.
                let status = if status.is_success() {
                    StatusCode::INVALID_HANDLE
                } else {
                    status
                };
                Err(QueueError::Transport {
                    operation: Operation::Open,
                    status,
                })
            }
        }
    }
}

impl std::fmt::Debug for QueueAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueAdmin")
            .field("transport", &self.transport.name())
            .field("initialized", &self.initialized.initialized())
            .finish()
    }
}
