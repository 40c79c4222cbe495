//! In-memory key/value store.
//!
//! Implements [`KeyValueStore`] over a `HashMap` for fast, deterministic
//! testing and development. Supports injected failures so the engine's
//! log-and-swallow storage error policy can be exercised.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use trolley_core::storage::{KeyValueStore, StorageError, StoredBlob};

/// In-memory [`KeyValueStore`] for fast, deterministic testing.
///
/// Clones share the same underlying map, mirroring how a real platform
/// store is a single shared resource.
///
/// # Example
///
/// ```
/// use trolley_testing::MemoryKeyStore;
/// use trolley_core::storage::KeyValueStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), trolley_core::storage::StorageError> {
/// let store = MemoryKeyStore::new();
///
/// store.set("cart-u1", serde_json::json!({"items": []})).await?;
/// assert!(store.get("cart-u1").await?.is_some());
///
/// store.remove("cart-u1").await?;
/// assert!(store.get("cart-u1").await?.is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryKeyStore {
    data: Arc<RwLock<HashMap<String, serde_json::Value>>>,
    fail_writes: Arc<RwLock<bool>>,
}

impl MemoryKeyStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored blobs (for test isolation)
    pub fn clear(&self) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Make every subsequent write fail until re-enabled
    ///
    /// Reads continue to succeed; this models a full or read-only backing
    /// store.
    pub fn fail_writes(&self, fail: bool) {
        *self
            .fail_writes
            .write()
            .unwrap_or_else(PoisonError::into_inner) = fail;
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Synchronous peek at a raw blob (test assertions only)
    #[must_use]
    pub fn peek(&self, key: &str) -> StoredBlob {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Synchronously seed a raw blob (test setup only)
    pub fn seed(&self, key: &str, value: serde_json::Value) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
    }

    fn writes_failing(&self) -> bool {
        *self
            .fail_writes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKeyStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<StoredBlob, StorageError>> {
        let value = self.peek(key);
        Box::pin(async move { Ok(value) })
    }

    fn set(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> BoxFuture<'_, Result<(), StorageError>> {
        if self.writes_failing() {
            let key = key.to_owned();
            return Box::pin(async move {
                Err(StorageError::WriteFailed {
                    key,
                    reason: "writes disabled".to_owned(),
                })
            });
        }

        self.seed(key, value);
        Box::pin(async move { Ok(()) })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, Result<(), StorageError>> {
        if self.writes_failing() {
            let key = key.to_owned();
            return Box::pin(async move {
                Err(StorageError::WriteFailed {
                    key,
                    reason: "writes disabled".to_owned(),
                })
            });
        }

        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Box::pin(async move { Ok(()) })
    }
}
