//! Message types for queue operations including core domain identifiers.

use crate::error::{SerializationError, ValidationError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum length of a message label, in characters
pub const MAX_MESSAGE_LABEL_LEN: usize = 250;

/// Maximum length of a queue label, in characters
pub const MAX_QUEUE_LABEL_LEN: usize = 124;

/// Size of the correlation id field carried by the transport, in bytes
pub const CORRELATION_ID_SIZE: usize = 20;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated queue name or path as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        if name.is_empty() || name.chars().count() > 260 {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: "must be 1-260 characters".to_string(),
            });
        }

        if name.chars().any(|c| c.is_control()) {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "control characters are not allowed".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Opaque identifier linking a response message to its request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(#[serde(with = "bytes_serde")] Bytes);

impl CorrelationId {
    /// Create correlation id from raw bytes
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self, ValidationError> {
        let bytes = bytes.into();
        if bytes.len() > CORRELATION_ID_SIZE {
            return Err(ValidationError::OutOfRange {
                field: "correlation_id".to_string(),
                message: format!("maximum {} bytes", CORRELATION_ID_SIZE),
            });
        }

        Ok(Self(bytes))
    }

    /// Create correlation id from the UTF-8 bytes of a string
    pub fn from_text(text: &str) -> Result<Self, ValidationError> {
        Self::new(Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Interpret the id as text, ignoring trailing zero padding
    pub fn to_text(&self) -> Option<&str> {
        let end = self
            .0
            .iter()
            .rposition(|b| *b != 0)
            .map_or(0, |index| index + 1);
        std::str::from_utf8(&self.0[..end]).ok()
    }
}

impl FromStr for CorrelationId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = s.parse::<DateTime<Utc>>()?;
        Ok(Self::from_datetime(dt))
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// Delivery priority of a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Normal,
    High,
}

impl Priority {
    /// Numeric priority level understood by the transport (0-7)
    pub fn level(&self) -> u8 {
        match self {
            Self::Normal => 3,
            Self::High => 7,
        }
    }

    /// Map a transport priority level back to a priority
    pub fn from_level(level: u8) -> Self {
        if level > Self::Normal.level() {
            Self::High
        } else {
            Self::Normal
        }
    }

    /// Choose the priority for a high-priority flag
    pub fn from_flag(high_priority: bool) -> Self {
        if high_priority {
            Self::High
        } else {
            Self::Normal
        }
    }
}

/// A message sent to or received from a queue.
///
/// A sender only has to supply the body; the label defaults to empty and the
/// correlation id to none. A received message is filled in completely by the
/// transport before it is returned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(with = "bytes_serde")]
    pub body: Bytes,
    pub label: String,
    pub correlation_id: Option<CorrelationId>,
    pub priority: Priority,
    /// Set by the transport on received messages
    pub arrived_at: Option<Timestamp>,
}

/// Custom serialization for Bytes
mod bytes_serde {
    use base64::{engine::general_purpose, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = general_purpose::STANDARD.encode(bytes);
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)?;
        Ok(Bytes::from(decoded))
    }
}

impl Message {
    /// Create new message with body
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Create new message whose body is the UTF-8 encoding of `text`
    pub fn from_text(text: &str) -> Self {
        Self::new(Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Create an empty message for the transport to fill in
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    /// Set the descriptive label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add correlation ID for request/response matching
    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Set delivery priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// View the body as UTF-8 text
    pub fn body_text(&self) -> Result<&str, SerializationError> {
        std::str::from_utf8(&self.body).map_err(|_| SerializationError::InvalidUtf8)
    }

    /// Check the fields a sender controls against transport limits
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.label.chars().count() > MAX_MESSAGE_LABEL_LEN {
            return Err(ValidationError::OutOfRange {
                field: "label".to_string(),
                message: format!("maximum {} characters", MAX_MESSAGE_LABEL_LEN),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
