//! Transport implementations.
//!
//! This module contains concrete implementations of the `Transport` and
//! `TransportSession` traits. Neither talks to a native queuing service;
//! they stand in for one in tests, development, and the command-line tool.

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemTransport;
pub use memory::InMemoryTransport;
