//! Client-side cart and draft stores for the Trolley mobile storefront.
//!
//! The cart is a single in-memory aggregate mutated through a reducer and
//! mirrored to a key/value backend with debounced writes. Identity
//! transitions (login, logout, account switch) reconcile which persisted
//! cart wins; while that runs, mutations are rejected rather than raced.
//! Address and prescription drafts share the machinery without persistence.
//!
//! # Wiring
//!
//! ```ignore
//! use std::sync::Arc;
//! use trolley_runtime::Store;
//! use trolley_storefront::{
//!     CartAction, CartEnvironment, CartReducer, CartState, IdentityScope,
//!     spawn_identity_listener,
//! };
//!
//! let env = CartEnvironment::new(platform_key_value_store());
//! let store = Store::new(CartState::boot(), CartReducer, env);
//! store.send(CartAction::Hydrate).await?;
//!
//! let identity = IdentityScope::guest();
//! spawn_identity_listener(store.clone(), &identity);
//! ```

pub mod drafts;
pub mod identity;
pub mod merge;
pub mod pricing;
pub mod reducer;
pub mod storage;
pub mod types;

pub use drafts::{
    ADDRESS_SAVED_TOPIC, AddressAction, AddressDraft, AddressDraftState, AddressEnvironment,
    AddressReducer, AddressUpdate, PrescriptionAction, PrescriptionDraftState, PrescriptionLine,
    PrescriptionReducer, PrescriptionUpdate,
};
pub use identity::{IdentityScope, spawn_identity_listener};
pub use pricing::Role;
pub use reducer::{
    CartAction, CartEnvironment, CartReducer, CartState, CartStore, LoadPhase,
};
pub use storage::CartStorage;
pub use types::{
    CartAggregate, CartUpdate, CatalogItem, Identity, LineItem, OwnerId, ShippingType,
};
