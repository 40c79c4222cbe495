//! Cart reconciliation across identity transitions.
//!
//! On login the guest cart wins outright: whatever the shopper built while
//! signed out is promoted verbatim into the authenticated slot, replacing
//! any server-side leftovers from a previous session. On logout the
//! outgoing user's slot is deleted so a shared device never shows one
//! account's cart to the next.

use crate::storage::CartStorage;
use crate::types::{CartAggregate, OwnerId};

/// Picks the cart an incoming authenticated session should start from.
///
/// A non-empty guest cart is copied into `user`'s slot and the guest slot is
/// cleared, so the promotion happens at most once per login. Otherwise the
/// user's own persisted cart is used, falling back to empty.
pub async fn reconcile_login(storage: &CartStorage, user: &OwnerId) -> CartAggregate {
    let guest_cart = storage
        .load_cart(&OwnerId::Guest)
        .await
        .filter(|cart| !cart.items.is_empty());

    if let Some(cart) = guest_cart {
        tracing::info!(owner = %user, items = cart.items.len(), "promoting guest cart");
        storage.save_cart(user, &cart).await;
        storage.remove_cart(&OwnerId::Guest).await;
        return cart;
    }

    match storage.load_cart(user).await {
        Some(cart) => cart,
        None => CartAggregate::empty(),
    }
}

/// Clears the outgoing owner's persisted cart on logout.
///
/// The guest slot is left alone; if an earlier guest session persisted a
/// cart it stays on disk for the next signed-out session to pick up.
pub async fn reconcile_logout(storage: &CartStorage, outgoing: &OwnerId) {
    if outgoing.is_guest() {
        return;
    }
    tracing::info!(owner = %outgoing, "clearing cart for signed-out user");
    storage.remove_cart(outgoing).await;
}
