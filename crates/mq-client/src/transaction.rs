//! Transaction policy applied to a single send.

use bytes::Bytes;

/// Coordinator that owns an externally supplied transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coordinator {
    /// Distributed transaction coordinator (MTS/COM+)
    Mts,
    /// XA-compliant transaction manager
    Xa,
}

/// Opaque handle to a transaction started outside this crate.
///
/// The token is passed through to the transport untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionContext {
    coordinator: Coordinator,
    token: Bytes,
}

impl TransactionContext {
    /// Wrap a transaction token issued by `coordinator`
    pub fn new(coordinator: Coordinator, token: impl Into<Bytes>) -> Self {
        Self {
            coordinator,
            token: token.into(),
        }
    }

    pub fn coordinator(&self) -> Coordinator {
        self.coordinator
    }

    pub fn token(&self) -> &[u8] {
        &self.token
    }
}

/// Whether and how a send takes part in a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransactionMode {
    /// Send outside any transaction
    #[default]
    None,
    /// The transport wraps this one send in its own transaction
    Single,
    /// The send joins a transaction coordinated elsewhere
    External(TransactionContext),
}

impl TransactionMode {
    /// Numeric transaction flag forwarded to the transport
    pub fn value(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::External(context) => match context.coordinator() {
                Coordinator::Mts => 1,
                Coordinator::Xa => 2,
            },
            Self::Single => 3,
        }
    }

    /// Check if the send runs inside a transaction
    pub fn is_transactional(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Single => f.write_str("single"),
            Self::External(context) => write!(f, "external({:?})", context.coordinator()),
        }
    }
}

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod tests;
