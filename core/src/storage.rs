//! Durable key/value storage abstraction.
//!
//! This module provides the [`KeyValueStore`] trait: a namespaced key/value
//! store holding JSON-serialized blobs. It is the only durability contract
//! the state engine relies on - three operations, no transactions across
//! keys.
//!
//! # Design Principles
//!
//! - **Async-first**: the backing store (platform key-value store, embedded
//!   DB, browser storage) completes reads and writes asynchronously
//! - **JSON blobs**: values are [`serde_json::Value`] so the backend never
//!   needs to know entity shapes
//! - **No multi-key atomicity**: callers must tolerate a crash between a
//!   `set` for one key and a `remove` of another
//!
//! # Dyn Compatibility
//!
//! This trait uses explicit boxed futures instead of `async fn` to enable
//! trait object usage (`Arc<dyn KeyValueStore>`). This is required for the
//! effect system where reducers create effects that capture the store.

use futures::future::BoxFuture;
use thiserror::Error;

/// Errors that can occur during key/value store operations.
///
/// The state engine treats every variant the same way: log and swallow,
/// keeping the in-memory state authoritative for the session.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// The backing store rejected or failed a read
    #[error("Read failed for key '{key}': {reason}")]
    ReadFailed {
        /// The key being read
        key: String,
        /// The reason for failure
        reason: String,
    },

    /// The backing store rejected or failed a write
    #[error("Write failed for key '{key}': {reason}")]
    WriteFailed {
        /// The key being written
        key: String,
        /// The reason for failure
        reason: String,
    },

    /// A stored blob could not be serialized or deserialized
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// The backing store is unavailable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result of a durable read: the blob if present.
pub type StoredBlob = Option<serde_json::Value>;

/// Trait for durable key/value store implementations.
///
/// Keys are plain strings; the state engine namespaces them itself
/// (`cart-{owner}`). Values are JSON blobs.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to support access from
/// spawned persistence effects.
pub trait KeyValueStore: Send + Sync {
    /// Read the blob stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadFailed`] if the backing store fails.
    /// A missing key is `Ok(None)`, not an error.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<StoredBlob, StorageError>>;

    /// Write `value` under `key`, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriteFailed`] if the backing store fails.
    fn set(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> BoxFuture<'_, Result<(), StorageError>>;

    /// Delete the blob stored under `key`.
    ///
    /// Removing an absent key is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriteFailed`] if the backing store fails.
    fn remove(&self, key: &str) -> BoxFuture<'_, Result<(), StorageError>>;
}
