//! The cart reducer: all mutation, reconciliation and persistence decisions.
//!
//! State only changes inside [`CartReducer::reduce`]; everything async
//! (storage reads, reconciliation, debounced writes) is returned as effects
//! and executed by the runtime. The reducer itself never fails: invalid
//! input is recorded on [`CartState::last_rejection`] and the state is left
//! untouched.

use std::sync::Arc;

use trolley_core::environment::{Clock, SystemClock};
use trolley_core::effect::Effect;
use trolley_core::reducer::Reducer;
use trolley_core::storage::KeyValueStore;
use trolley_core::{SmallVec, smallvec};
use trolley_runtime::DebounceGate;
use trolley_runtime::debounce::WriteTicket;

use crate::merge;
use crate::pricing::Role;
use crate::storage::CartStorage;
use crate::types::{CartAggregate, CartUpdate, CatalogItem, Identity, LineItem, OwnerId};

/// Whether the cart slot for the current owner has been loaded yet.
///
/// Mutations arriving during `Loading` are rejected; the persisted blob has
/// not been read and applying them would race the load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPhase {
    Loading,
    #[default]
    Ready,
}

/// In-memory cart state: the authoritative copy all surfaces read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CartState {
    pub owner: OwnerId,
    pub role: Role,
    pub phase: LoadPhase,
    pub cart: CartAggregate,
    /// Why the most recent mutation was rejected, for diagnostics only.
    pub last_rejection: Option<String>,
}

impl CartState {
    /// Fresh-process state: a guest cart that still has to be hydrated.
    /// Send [`CartAction::Hydrate`] right after creating the store.
    pub fn boot() -> Self {
        Self {
            phase: LoadPhase::Loading,
            ..Self::default()
        }
    }

    /// An already-loaded cart for `owner`. Useful for embedding the store
    /// without persistence and as a test starting point.
    pub fn ready(owner: OwnerId, role: Role) -> Self {
        Self {
            owner,
            role,
            phase: LoadPhase::Ready,
            cart: CartAggregate::empty(),
            last_rejection: None,
        }
    }

    pub fn item_count(&self) -> u32 {
        self.cart.item_count()
    }

    pub fn quantity_of(&self, id: &str) -> u32 {
        self.cart.quantity_of(id)
    }
}

/// Everything the cart's effects need from the outside world.
#[derive(Clone)]
pub struct CartEnvironment {
    pub storage: CartStorage,
    pub debounce: DebounceGate,
    pub clock: Arc<dyn Clock>,
}

impl CartEnvironment {
    /// Production wiring: system clock and the default persistence window.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage: CartStorage::new(store),
            debounce: DebounceGate::default(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for CartEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartEnvironment").finish_non_exhaustive()
    }
}

/// Every input the cart store accepts.
#[derive(Clone, Debug, PartialEq)]
pub enum CartAction {
    /// Load the current owner's persisted cart. Sent once at process start.
    Hydrate,
    /// Add one unit of the item, or bump its quantity if already present.
    AddItem(CatalogItem),
    /// Decrement the item's quantity, removing the line at zero.
    RemoveOrDecrement { id: String },
    /// Drop the item's line entirely, whatever its quantity.
    Remove { id: String },
    /// Set the item's quantity outright; zero removes the line.
    SetQuantity { id: String, qty: u32 },
    /// Partially update the fulfilment fields and/or replace the items.
    Update(CartUpdate),
    /// Restore the canonical empty cart and persist it immediately.
    Reset,
    /// The account's pricing role changed; re-derive the total.
    RoleChanged(Role),
    /// The session identity changed; reconcile cart ownership.
    IdentityChanged(Identity),
    /// A load or reconciliation finished. Internal feedback action.
    Loaded { owner: OwnerId, cart: CartAggregate },
}

/// Reducer for [`CartState`]. Stateless; all context comes from the
/// environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct CartReducer;

/// The fully-wired cart store runtime.
pub type CartStore = trolley_runtime::Store<CartState, CartAction, CartEnvironment, CartReducer>;

type CartEffects = SmallVec<[Effect<CartAction>; 4]>;

impl Reducer for CartReducer {
    type State = CartState;
    type Action = CartAction;
    type Environment = CartEnvironment;

    fn reduce(
        &self,
        state: &mut CartState,
        action: CartAction,
        env: &CartEnvironment,
    ) -> CartEffects {
        match action {
            CartAction::Hydrate => hydrate(state, env),
            CartAction::Loaded { owner, cart } => loaded(state, owner, cart),
            CartAction::IdentityChanged(identity) => identity_changed(state, identity, env),
            CartAction::RoleChanged(role) => {
                if role != state.role {
                    state.role = role;
                    state.cart.recompute_total(role);
                }
                SmallVec::new()
            }
            mutation => {
                if state.phase == LoadPhase::Loading {
                    return reject(state, "cart not yet loaded");
                }
                apply_mutation(state, mutation, env)
            }
        }
    }
}

fn hydrate(state: &mut CartState, env: &CartEnvironment) -> CartEffects {
    state.phase = LoadPhase::Loading;
    state.last_rejection = None;
    let storage = env.storage.clone();
    let owner = state.owner.clone();
    smallvec![Effect::future(async move {
        let cart = storage
            .load_cart(&owner)
            .await
            .unwrap_or_else(CartAggregate::empty);
        Some(CartAction::Loaded { owner, cart })
    })]
}

fn loaded(state: &mut CartState, owner: OwnerId, cart: CartAggregate) -> CartEffects {
    // A load that raced a newer identity transition resolves for the wrong
    // owner; the transition already scheduled its own load.
    if owner != state.owner {
        tracing::debug!(loaded = %owner, current = %state.owner, "dropping stale cart load");
        return SmallVec::new();
    }
    state.cart = cart;
    state.cart.recompute_total(state.role);
    state.phase = LoadPhase::Ready;
    tracing::debug!(owner = %state.owner, items = state.cart.items.len(), "cart loaded");
    SmallVec::new()
}

fn identity_changed(
    state: &mut CartState,
    identity: Identity,
    env: &CartEnvironment,
) -> CartEffects {
    let new_owner = identity.owner();
    let new_role = identity.resolved_role();

    if new_owner == state.owner {
        // Same session, possibly a new role. Never re-runs reconciliation.
        if new_role != state.role {
            state.role = new_role;
            state.cart.recompute_total(new_role);
        }
        return SmallVec::new();
    }

    // The outgoing in-memory cart is ahead of its debounced blob; capture
    // it now so the transition can write it through before reconciling.
    // While still loading there is nothing authoritative to flush.
    let outgoing_snapshot = (state.phase == LoadPhase::Ready).then(|| state.cart.clone());

    state.role = new_role;
    state.phase = LoadPhase::Loading;
    state.last_rejection = None;
    // Any write still waiting on the old owner's slot must not land.
    env.debounce.cancel();

    let outgoing = std::mem::replace(&mut state.owner, new_owner.clone());
    let storage = env.storage.clone();
    match new_owner {
        OwnerId::User(_) => {
            tracing::info!(from = %outgoing, to = %new_owner, "identity changed, reconciling carts");
            smallvec![Effect::future(async move {
                if let Some(snapshot) = outgoing_snapshot {
                    storage.save_cart(&outgoing, &snapshot).await;
                }
                let cart = merge::reconcile_login(&storage, &new_owner).await;
                Some(CartAction::Loaded {
                    owner: new_owner,
                    cart,
                })
            })]
        }
        OwnerId::Guest => {
            tracing::info!(from = %outgoing, "signed out, dropping user cart");
            smallvec![Effect::future(async move {
                merge::reconcile_logout(&storage, &outgoing).await;
                Some(CartAction::Loaded {
                    owner: OwnerId::Guest,
                    cart: CartAggregate::empty(),
                })
            })]
        }
    }
}

fn apply_mutation(state: &mut CartState, action: CartAction, env: &CartEnvironment) -> CartEffects {
    let changed = match action {
        CartAction::AddItem(item) => {
            if item.id.is_empty() {
                return reject(state, "item missing id");
            }
            match state.cart.items.iter_mut().find(|line| line.id == item.id) {
                Some(line) => line.qty = line.qty.saturating_add(1),
                None => state.cart.items.push(LineItem::from_catalog(item, 1)),
            }
            true
        }
        CartAction::RemoveOrDecrement { id } => decrement(&mut state.cart.items, &id),
        CartAction::Remove { id } => remove_line(&mut state.cart.items, &id),
        CartAction::SetQuantity { id, qty: 0 } => remove_line(&mut state.cart.items, &id),
        CartAction::SetQuantity { id, qty } => {
            match state.cart.items.iter_mut().find(|line| line.id == id) {
                Some(line) if line.qty != qty => {
                    line.qty = qty;
                    true
                }
                Some(_) => false,
                None => {
                    tracing::debug!(%id, "set_quantity for item not in cart, ignoring");
                    false
                }
            }
        }
        CartAction::Update(update) => {
            if let Some(items) = &update.items {
                if let Err(reason) = validate_items(items) {
                    return reject(state, reason);
                }
            }
            apply_update(&mut state.cart, update)
        }
        CartAction::Reset => {
            state.cart = CartAggregate::empty();
            state.cart.updated_at = env.clock.now();
            state.last_rejection = None;
            // Reset writes through: invalidate anything in flight and
            // persist the empty cart now rather than after the window.
            let ticket = env.debounce.flush();
            return smallvec![persist(state, env, ticket)];
        }
        // Hydrate/Loaded/RoleChanged/IdentityChanged are matched by the
        // caller before this function.
        _ => return SmallVec::new(),
    };

    if !changed {
        return SmallVec::new();
    }
    state.cart.recompute_total(state.role);
    state.cart.updated_at = env.clock.now();
    state.last_rejection = None;
    debounced_persist(state, env)
}

fn decrement(items: &mut Vec<LineItem>, id: &str) -> bool {
    let Some(index) = items.iter().position(|line| line.id == id) else {
        return false;
    };
    if items[index].qty > 1 {
        items[index].qty -= 1;
    } else {
        items.remove(index);
    }
    true
}

fn remove_line(items: &mut Vec<LineItem>, id: &str) -> bool {
    let before = items.len();
    items.retain(|line| line.id != id);
    items.len() != before
}

fn validate_items(items: &[LineItem]) -> Result<(), &'static str> {
    let mut seen = std::collections::HashSet::new();
    for line in items {
        if line.id.is_empty() {
            return Err("item missing id");
        }
        if line.qty == 0 {
            return Err("item with zero quantity");
        }
        if !seen.insert(line.id.as_str()) {
            return Err("duplicate item id");
        }
    }
    Ok(())
}

fn apply_update(cart: &mut CartAggregate, update: CartUpdate) -> bool {
    let mut changed = false;
    if let Some(location_id) = update.location_id {
        changed |= cart.location_id != location_id;
        cart.location_id = location_id;
    }
    if let Some(retailer_id) = update.retailer_id {
        changed |= cart.retailer_id != retailer_id;
        cart.retailer_id = retailer_id;
    }
    if let Some(shipping_type) = update.shipping_type {
        changed |= cart.shipping_type != shipping_type;
        cart.shipping_type = shipping_type;
    }
    if let Some(items) = update.items {
        changed |= cart.items != items;
        cart.items = items;
    }
    changed
}

fn reject(state: &mut CartState, reason: &str) -> CartEffects {
    tracing::debug!(reason, "cart mutation rejected");
    state.last_rejection = Some(reason.to_owned());
    SmallVec::new()
}

/// Schedules a persist unless a debounce window is already open, in which
/// case this mutation coalesces into the write that opened it.
fn debounced_persist(state: &CartState, env: &CartEnvironment) -> CartEffects {
    match env.debounce.try_fire() {
        Some(ticket) => smallvec![persist(state, env, ticket)],
        None => {
            tracing::trace!("cart persist coalesced into open window");
            SmallVec::new()
        }
    }
}

fn persist(state: &CartState, env: &CartEnvironment, ticket: WriteTicket) -> Effect<CartAction> {
    let storage = env.storage.clone();
    let owner = state.owner.clone();
    let snapshot = state.cart.clone();
    Effect::future(async move {
        if ticket.is_live() {
            storage.save_cart(&owner, &snapshot).await;
        } else {
            tracing::debug!(owner = %owner, "dropping superseded cart write");
        }
        None
    })
}
