//! Session identity publishing.
//!
//! [`IdentityScope`] is the single writer for the session's [`Identity`];
//! the cart subscribes through [`spawn_identity_listener`] and receives one
//! `IdentityChanged` action per actual transition. Re-publishing an equal
//! identity does not wake subscribers, so reconciliation runs exactly once
//! per transition.

use tokio::sync::watch;

use crate::reducer::{CartAction, CartStore};
use crate::types::Identity;

/// Shared handle on the current session identity.
#[derive(Clone, Debug)]
pub struct IdentityScope {
    tx: watch::Sender<Identity>,
}

impl IdentityScope {
    pub fn new(initial: Identity) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// A scope starting signed out.
    pub fn guest() -> Self {
        Self::new(Identity::guest())
    }

    pub fn current(&self) -> Identity {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Identity> {
        self.tx.subscribe()
    }

    /// Publishes `identity`, waking subscribers only if it differs from the
    /// current one.
    pub fn set(&self, identity: Identity) {
        self.tx.send_if_modified(|current| {
            if *current == identity {
                false
            } else {
                *current = identity;
                true
            }
        });
    }

    /// Marks the session authenticated as `user_id` with a raw role string.
    pub fn log_in(&self, user_id: impl Into<String>, role: impl Into<String>) {
        self.set(Identity::user(user_id, role));
    }

    /// Drops back to a signed-out session.
    pub fn log_out(&self) {
        self.set(Identity::guest());
    }

    /// Updates only the role of the current session.
    pub fn set_role(&self, role: impl Into<String>) {
        let mut identity = self.current();
        identity.role = role.into();
        self.set(identity);
    }
}

impl Default for IdentityScope {
    fn default() -> Self {
        Self::guest()
    }
}

/// Forwards identity transitions from `scope` into the cart store.
///
/// The task ends when the scope is dropped or the store shuts down.
pub fn spawn_identity_listener(
    store: CartStore,
    scope: &IdentityScope,
) -> tokio::task::JoinHandle<()> {
    let mut rx = scope.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let identity = rx.borrow_and_update().clone();
            match store.send(CartAction::IdentityChanged(identity)).await {
                // Let each reconciliation settle before the next transition.
                Ok(mut handle) => handle.wait().await,
                Err(error) => {
                    tracing::debug!(%error, "cart store gone, stopping identity listener");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn equal_identity_does_not_wake_subscribers() {
        let scope = IdentityScope::guest();
        let mut rx = scope.subscribe();

        scope.log_out(); // already guest
        assert!(!rx.has_changed().unwrap_or(true));

        scope.log_in("u-1", "retail");
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow_and_update().owner().to_string(), "u-1");

        scope.log_in("u-1", "retail"); // same session again
        assert!(!rx.has_changed().unwrap_or(true));
    }

    #[tokio::test]
    async fn set_role_keeps_the_user() {
        let scope = IdentityScope::guest();
        scope.log_in("u-1", "retail");
        scope.set_role("trade");

        let identity = scope.current();
        assert_eq!(identity.user_id.as_deref(), Some("u-1"));
        assert_eq!(identity.role, "trade");
    }
}
