//! Identity transitions driven through [`IdentityScope`] and the spawned
//! listener, observed via the store's action broadcast.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // test code

use std::sync::Arc;
use std::time::Duration;

use trolley_core::storage::KeyValueStore;
use trolley_runtime::Store;
use trolley_storefront::{
    CartAction, CartEnvironment, CartReducer, CartState, CartStore, CatalogItem, IdentityScope,
    OwnerId, Role, spawn_identity_listener,
};
use trolley_testing::{MemoryKeyStore, test_clock};

fn test_store(backend: Arc<MemoryKeyStore>) -> CartStore {
    let env = CartEnvironment::new(backend as Arc<dyn KeyValueStore>)
        .with_clock(Arc::new(test_clock()));
    Store::new(CartState::ready(OwnerId::Guest, Role::Retail), CartReducer, env)
}

async fn next_loaded(rx: &mut tokio::sync::broadcast::Receiver<CartAction>) -> OwnerId {
    loop {
        let action = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("a load should land promptly")
            .expect("broadcast is open");
        if let CartAction::Loaded { owner, .. } = action {
            return owner;
        }
    }
}

#[tokio::test]
async fn login_and_logout_flow_through_the_listener() {
    let backend = Arc::new(MemoryKeyStore::new());
    let store = test_store(Arc::clone(&backend));
    let mut actions = store.subscribe_actions();

    let scope = IdentityScope::guest();
    let listener = spawn_identity_listener(store.clone(), &scope);

    let mut handle = store
        .send(CartAction::AddItem(CatalogItem {
            id: "sku-1".to_owned(),
            retail_price: 150,
            trade_price: 120,
            ..CatalogItem::default()
        }))
        .await
        .expect("store is running");
    handle.wait().await;

    scope.log_in("u-1", "trade");
    assert_eq!(next_loaded(&mut actions).await, OwnerId::User("u-1".to_owned()));

    let (owner, role, qty) = store
        .state(|s| (s.owner.clone(), s.role, s.quantity_of("sku-1")))
        .await;
    assert_eq!(owner, OwnerId::User("u-1".to_owned()));
    assert_eq!(role, Role::Trade);
    assert_eq!(qty, 1);

    scope.log_out();
    assert_eq!(next_loaded(&mut actions).await, OwnerId::Guest);
    assert!(backend.peek("cart-u-1").is_none());

    drop(scope);
    let _ = tokio::time::timeout(Duration::from_secs(1), listener).await;
}

#[tokio::test]
async fn republishing_the_same_identity_runs_no_reconciliation() {
    let backend = Arc::new(MemoryKeyStore::new());
    let store = test_store(Arc::clone(&backend));
    let mut actions = store.subscribe_actions();

    let scope = IdentityScope::guest();
    let _listener = spawn_identity_listener(store.clone(), &scope);

    scope.log_in("u-1", "retail");
    assert_eq!(next_loaded(&mut actions).await, OwnerId::User("u-1".to_owned()));

    // Same identity again: the watch channel swallows it, so no second
    // Loaded ever arrives.
    scope.log_in("u-1", "retail");
    let second = tokio::time::timeout(Duration::from_millis(200), actions.recv()).await;
    assert!(second.is_err(), "no action should follow a no-op publish");
}
