//! Cart persistence adapter.
//!
//! Wraps any [`KeyValueStore`] backend and gives the reducer an infallible
//! surface: storage failures and corrupt blobs are logged and absorbed here,
//! so a flaky disk degrades the cart to in-memory-only instead of surfacing
//! errors to shopping flows.

use std::sync::Arc;

use trolley_core::storage::KeyValueStore;

use crate::types::{CartAggregate, OwnerId};

/// JSON codec plus error absorption on top of a raw key-value backend.
#[derive(Clone)]
pub struct CartStorage {
    store: Arc<dyn KeyValueStore>,
}

impl CartStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Loads the persisted cart for `owner`.
    ///
    /// Returns `None` for an absent key, a backend failure, or a blob that
    /// no longer deserializes; the latter two are logged. Callers treat all
    /// three the same way: start from an empty cart.
    pub async fn load_cart(&self, owner: &OwnerId) -> Option<CartAggregate> {
        let key = owner.storage_key();
        let blob = match self.store.get(&key).await {
            Ok(blob) => blob?,
            Err(error) => {
                tracing::warn!(%key, %error, "cart load failed, starting empty");
                return None;
            }
        };
        match serde_json::from_value(blob) {
            Ok(cart) => Some(cart),
            Err(error) => {
                tracing::warn!(%key, %error, "discarding corrupt cart blob");
                None
            }
        }
    }

    /// Persists `cart` under `owner`'s slot. Failures are logged and
    /// swallowed; the in-memory cart stays authoritative either way.
    pub async fn save_cart(&self, owner: &OwnerId, cart: &CartAggregate) {
        let key = owner.storage_key();
        let blob = match serde_json::to_value(cart) {
            Ok(blob) => blob,
            Err(error) => {
                tracing::warn!(%key, %error, "cart failed to serialize, skipping persist");
                return;
            }
        };
        if let Err(error) = self.store.set(&key, blob).await {
            tracing::warn!(%key, %error, "cart persist failed");
        } else {
            tracing::debug!(%key, items = cart.items.len(), "cart persisted");
        }
    }

    /// Deletes `owner`'s persisted cart. Missing keys and backend failures
    /// are both non-events.
    pub async fn remove_cart(&self, owner: &OwnerId) {
        let key = owner.storage_key();
        if let Err(error) = self.store.remove(&key).await {
            tracing::warn!(%key, %error, "cart removal failed");
        }
    }
}

impl std::fmt::Debug for CartStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStorage").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trolley_testing::MemoryKeyStore;

    #[tokio::test]
    async fn roundtrips_a_cart() {
        let backend = Arc::new(MemoryKeyStore::new());
        let storage = CartStorage::new(backend);
        let owner = OwnerId::User("u-1".to_owned());

        let mut cart = CartAggregate::empty();
        cart.location_id = "loc-9".to_owned();
        storage.save_cart(&owner, &cart).await;

        let loaded = storage.load_cart(&owner).await;
        assert_eq!(loaded, Some(cart));
    }

    #[tokio::test]
    async fn absent_key_loads_none() {
        let storage = CartStorage::new(Arc::new(MemoryKeyStore::new()));
        assert_eq!(storage.load_cart(&OwnerId::Guest).await, None);
    }

    #[tokio::test]
    async fn corrupt_blob_loads_none() {
        let backend = Arc::new(MemoryKeyStore::new());
        backend.seed("cart-unauthenticated", serde_json::json!("not a cart"));
        let storage = CartStorage::new(backend);
        assert_eq!(storage.load_cart(&OwnerId::Guest).await, None);
    }

    #[tokio::test]
    async fn write_failures_are_swallowed() {
        let backend = Arc::new(MemoryKeyStore::new());
        backend.fail_writes(true);
        let storage = CartStorage::new(Arc::clone(&backend) as Arc<dyn KeyValueStore>);

        storage.save_cart(&OwnerId::Guest, &CartAggregate::empty()).await;
        storage.remove_cart(&OwnerId::Guest).await;
        assert!(backend.is_empty());
    }
}
