//! Transport status codes and the failure categories they map to.
//!
//! The transport boundary reports every outcome as a 32-bit status where `0`
//! means success. [`StatusCode::category`] turns any such value into a
//! [`FailureCategory`]; the mapping is total and has no side effects.

use crate::error::{Operation, QueueError};
use serde::{Deserialize, Serialize};

/// Raw status value reported by the transport boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusCode(u32);

impl StatusCode {
    pub const SUCCESS: Self = Self(0);
    pub const PROPERTY: Self = Self(0xC00E_0002);
    pub const QUEUE_NOT_FOUND: Self = Self(0xC00E_0003);
    pub const QUEUE_EXISTS: Self = Self(0xC00E_0005);
    pub const INVALID_PARAMETER: Self = Self(0xC00E_0006);
    pub const INVALID_HANDLE: Self = Self(0xC00E_0007);
    pub const SERVICE_NOT_AVAILABLE: Self = Self(0xC00E_000B);
    pub const NO_DS: Self = Self(0xC00E_0013);
    pub const ILLEGAL_QUEUE_PATHNAME: Self = Self(0xC00E_0014);
    pub const IO_TIMEOUT: Self = Self(0xC00E_001B);
    pub const ILLEGAL_FORMATNAME: Self = Self(0xC00E_001E);
    pub const ACCESS_DENIED: Self = Self(0xC00E_0025);
    pub const INSUFFICIENT_PROPERTIES: Self = Self(0xC00E_003F);
    pub const INVALID_OWNER: Self = Self(0xC00E_0044);
    pub const UNSUPPORTED_ACCESS_MODE: Self = Self(0xC00E_0045);
    pub const QUEUE_DELETED: Self = Self(0xC00E_005A);
    pub const REMOTE_MACHINE_NOT_AVAILABLE: Self = Self(0xC00E_0069);

    /// Wrap a raw status value
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    /// Get the raw status value
    pub const fn code(&self) -> u32 {
        self.0
    }

    /// Check if the status reports success
    pub const fn is_success(&self) -> bool {
        self.0 == 0
    }

    /// Map the status to its failure category
    pub fn category(&self) -> FailureCategory {
        match *self {
            Self::SUCCESS => FailureCategory::Success,
            Self::PROPERTY => FailureCategory::PropertyError,
            Self::QUEUE_NOT_FOUND => FailureCategory::QueueNotFound,
            Self::QUEUE_EXISTS => FailureCategory::QueueExists,
            Self::INVALID_PARAMETER => FailureCategory::InvalidParameter,
            Self::INVALID_HANDLE => FailureCategory::InvalidHandle,
            Self::QUEUE_DELETED => FailureCategory::QueueDeleted,
            Self::SERVICE_NOT_AVAILABLE => FailureCategory::ServiceUnavailable,
            Self::IO_TIMEOUT => FailureCategory::IoTimeout,
            Self::ILLEGAL_FORMATNAME => FailureCategory::IllegalFormatName,
            Self::ACCESS_DENIED => FailureCategory::AccessDenied,
            Self::NO_DS => FailureCategory::DirectoryServiceUnavailable,
            Self::INSUFFICIENT_PROPERTIES => FailureCategory::InsufficientProperties,
            Self::ILLEGAL_QUEUE_PATHNAME => FailureCategory::IllegalQueuePathname,
            Self::INVALID_OWNER => FailureCategory::InvalidOwner,
            Self::UNSUPPORTED_ACCESS_MODE => FailureCategory::UnsupportedAccessMode,
            Self::REMOTE_MACHINE_NOT_AVAILABLE => FailureCategory::RemoteMachineUnavailable,
            Self(code) => FailureCategory::Unknown(code),
        }
    }

    /// Convert the status into a result for the given operation.
    ///
    /// Success short-circuits to `Ok(())`; every other value becomes a
    /// [`QueueError::Transport`] carrying the status.
    pub fn check(self, operation: Operation) -> Result<(), QueueError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(QueueError::Transport {
                operation,
                status: self,
            })
        }
    }
}

impl From<u32> for StatusCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Symbolic category for a transport status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    Success,
    PropertyError,
    QueueNotFound,
    QueueExists,
    InvalidParameter,
    InvalidHandle,
    QueueDeleted,
    ServiceUnavailable,
    IoTimeout,
    IllegalFormatName,
    AccessDenied,
    DirectoryServiceUnavailable,
    InsufficientProperties,
    IllegalQueuePathname,
    InvalidOwner,
    UnsupportedAccessMode,
    RemoteMachineUnavailable,
    /// Any status that has no entry in the table
    Unknown(u32),
}

impl FailureCategory {
    /// Get the mnemonic for the category, `None` for unknown codes
    pub fn symbol(&self) -> Option<&'static str> {
        let symbol = match self {
            Self::Success => "SUCCESS",
            Self::PropertyError => "MQ_ERROR_PROPERTY",
            Self::QueueNotFound => "MQ_ERROR_QUEUE_NOT_FOUND",
            Self::QueueExists => "MQ_ERROR_QUEUE_EXISTS",
            Self::InvalidParameter => "MQ_ERROR_INVALID_PARAMETER",
            Self::InvalidHandle => "MQ_ERROR_INVALID_HANDLE",
            Self::QueueDeleted => "MQ_ERROR_QUEUE_DELETED",
            Self::ServiceUnavailable => "MQ_ERROR_SERVICE_NOT_AVAILABLE",
            Self::IoTimeout => "MQ_ERROR_IO_TIMEOUT",
            Self::IllegalFormatName => "MQ_ERROR_ILLEGAL_FORMATNAME",
            Self::AccessDenied => "MQ_ERROR_ACCESS_DENIED",
            Self::DirectoryServiceUnavailable => "MQ_ERROR_NO_DS",
            Self::InsufficientProperties => "MQ_ERROR_INSUFFICIENT_PROPERTIES",
            Self::IllegalQueuePathname => "MQ_ERROR_ILLEGAL_QUEUE_PATHNAME",
            Self::InvalidOwner => "MQ_ERROR_INVALID_OWNER",
            Self::UnsupportedAccessMode => "MQ_ERROR_UNSUPPORTED_ACCESS_MODE",
            Self::RemoteMachineUnavailable => "MQ_ERROR_REMOTE_MACHINE_NOT_AVAILABLE",
            Self::Unknown(_) => return None,
        };
        Some(symbol)
    }

    /// Check if the category describes a rejected input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter
                | Self::IllegalFormatName
                | Self::IllegalQueuePathname
                | Self::InsufficientProperties
        )
    }

    /// Check if the category describes a missing or stale resource
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::QueueNotFound | Self::QueueExists | Self::QueueDeleted | Self::InvalidHandle
        )
    }

    /// Check if the category describes a permission failure
    pub fn is_permission(&self) -> bool {
        matches!(
            self,
            Self::AccessDenied | Self::InvalidOwner | Self::UnsupportedAccessMode
        )
    }

    /// Check if the category describes an unavailable service or an expired wait
    pub fn is_availability(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable
                | Self::RemoteMachineUnavailable
                | Self::DirectoryServiceUnavailable
                | Self::IoTimeout
        )
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self, self.symbol()) {
            (_, Some(symbol)) => f.write_str(symbol),
            (Self::Unknown(code), None) => write!(f, "unknown hr ({})", *code as i32),
            (_, None) => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
