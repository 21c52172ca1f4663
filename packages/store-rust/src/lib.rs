//! Remote Hash Store: an in-memory [`HashCommands`](remote_hash_core::HashCommands)
//! backend for typed remote hashes.
//!
//! A [`Keyspace`] keeps named hashes in memory with the same observable
//! behaviour a remote key-value server exposes: key-ordered scan pages,
//! continuation tokens where the start token equals the end token, optional
//! empty non-terminal pages, and collections that vanish with their last field.

pub mod config;
pub mod memory;

pub use config::StoreConfig;
pub use memory::{Keyspace, MemoryHash, MemoryToken};
