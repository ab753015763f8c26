//! Client and transport configuration.

use crate::transport::ReceiveTimeout;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for queue client initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub transport: TransportConfig,
    /// Receive timeout used when a caller does not pass one; `0` waits forever
    #[serde(default = "default_receive_timeout_ms")]
    pub default_receive_timeout_ms: u64,
}

fn default_receive_timeout_ms() -> u64 {
    30_000
}

impl ClientConfig {
    /// Get the default receive timeout
    pub fn default_receive_timeout(&self) -> ReceiveTimeout {
        ReceiveTimeout::from_millis(self.default_receive_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::InMemory(InMemoryConfig::default()),
            default_receive_timeout_ms: default_receive_timeout_ms(),
        }
    }
}

/// Transport-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    InMemory(InMemoryConfig),
    FileSystem(FileSystemConfig),
}

/// In-memory transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryConfig {
    /// Maximum number of messages a single queue may hold
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

fn default_max_queue_size() -> usize {
    10_000
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
        }
    }
}

/// File-system transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSystemConfig {
    /// Directory that holds one subdirectory per queue
    pub root: PathBuf,
    /// How often a blocked receive rescans its queue directory
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    25
}

impl FileSystemConfig {
    /// Create configuration rooted at `root` with default polling
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
