//! Domain types for the cart store.
//!
//! The persisted shape is [`CartAggregate`]: the line items plus the
//! fulfilment fields that travel with them. Everything here serializes to
//! JSON so it can round-trip through any [`KeyValueStore`] backend.
//!
//! [`KeyValueStore`]: trolley_core::storage::KeyValueStore

use serde::{Deserialize, Serialize};
use trolley_core::{DateTime, Utc};

use crate::pricing::Role;

/// How the current cart will be fulfilled.
///
/// Persisted as a bare integer (`0` delivery, `1` pickup) to match the wire
/// shape the checkout services expect. Unknown integers from older blobs
/// degrade to delivery rather than failing the whole load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum ShippingType {
    #[default]
    Delivery,
    Pickup,
}

impl From<ShippingType> for u8 {
    fn from(value: ShippingType) -> Self {
        match value {
            ShippingType::Delivery => 0,
            ShippingType::Pickup => 1,
        }
    }
}

impl From<u8> for ShippingType {
    fn from(value: u8) -> Self {
        match value {
            1 => ShippingType::Pickup,
            _ => ShippingType::Delivery,
        }
    }
}

/// A purchasable product as handed to the cart by a product surface.
///
/// Carries both price points so the cart can re-derive its total whenever
/// the account role changes, without another catalog round trip.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    /// Unit price shown to retail accounts, in minor currency units.
    #[serde(default)]
    pub retail_price: i64,
    /// Unit price shown to trade accounts, in minor currency units.
    #[serde(default)]
    pub trade_price: i64,
}

/// One cart line: a catalog item plus how many of it are in the cart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub retail_price: i64,
    #[serde(default)]
    pub trade_price: i64,
    pub qty: u32,
}

impl LineItem {
    /// Builds a fresh line for `item` with a starting quantity.
    pub fn from_catalog(item: CatalogItem, qty: u32) -> Self {
        Self {
            id: item.id,
            name: item.name,
            image_url: item.image_url,
            retail_price: item.retail_price,
            trade_price: item.trade_price,
            qty,
        }
    }
}

/// The complete cart payload, both the in-memory working copy and the
/// persisted JSON blob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartAggregate {
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Derived from `items` and the active role; never accepted from input.
    #[serde(default)]
    pub total_amount: i64,
    /// Selected fulfilment location, empty until the shopper picks one.
    #[serde(default)]
    pub location_id: String,
    #[serde(default)]
    pub retailer_id: String,
    #[serde(default)]
    pub shipping_type: ShippingType,
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Default for CartAggregate {
    fn default() -> Self {
        Self::empty()
    }
}

impl CartAggregate {
    /// The canonical empty cart, also what `Reset` restores.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_amount: 0,
            location_id: String::new(),
            retailer_id: String::new(),
            shipping_type: ShippingType::Delivery,
            updated_at: epoch(),
        }
    }

    /// Total number of units across all lines, saturating at `u32::MAX`.
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.qty))
    }

    /// Quantity of a single item, zero when the item is not in the cart.
    pub fn quantity_of(&self, id: &str) -> u32 {
        self.items
            .iter()
            .find(|line| line.id == id)
            .map_or(0, |line| line.qty)
    }

    /// Recomputes `total_amount` from the line items under `role`.
    pub fn recompute_total(&mut self, role: Role) {
        self.total_amount = role.total(&self.items);
    }
}

/// Partial update for the cart's fulfilment fields. `None` leaves the
/// corresponding field untouched; replacing `items` re-derives the total.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CartUpdate {
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub retailer_id: Option<String>,
    #[serde(default)]
    pub shipping_type: Option<ShippingType>,
    #[serde(default)]
    pub items: Option<Vec<LineItem>>,
}

/// Who owns the currently-active cart slot.
///
/// A signed-out session uses the [`OwnerId::Guest`] sentinel so its cart
/// persists under a stable key across restarts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum OwnerId {
    #[default]
    Guest,
    User(String),
}

impl OwnerId {
    /// The persistence key for this owner's cart blob.
    pub fn storage_key(&self) -> String {
        match self {
            OwnerId::Guest => "cart-unauthenticated".to_owned(),
            OwnerId::User(id) => format!("cart-{id}"),
        }
    }

    pub const fn is_guest(&self) -> bool {
        matches!(self, OwnerId::Guest)
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnerId::Guest => f.write_str("unauthenticated"),
            OwnerId::User(id) => f.write_str(id),
        }
    }
}

/// A snapshot of the authentication session, as published by the identity
/// layer. The `role` string stays raw here; [`Identity::resolved_role`]
/// normalizes it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    pub logged_in: bool,
    pub user_id: Option<String>,
    pub role: String,
}

impl Identity {
    /// A signed-out session.
    pub fn guest() -> Self {
        Self::default()
    }

    /// An authenticated session for `user_id` with the given raw role.
    pub fn user(user_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            logged_in: true,
            user_id: Some(user_id.into()),
            role: role.into(),
        }
    }

    /// The cart owner this session maps to. A "logged in" session without a
    /// user id is treated as guest; there is no slot to key it under.
    pub fn owner(&self) -> OwnerId {
        match (&self.user_id, self.logged_in) {
            (Some(id), true) => OwnerId::User(id.clone()),
            _ => OwnerId::Guest,
        }
    }

    /// The pricing role for this session.
    pub fn resolved_role(&self) -> Role {
        Role::parse(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipping_type_serializes_as_integer() {
        let json = serde_json::to_value(ShippingType::Pickup).unwrap_or_default();
        assert_eq!(json, serde_json::json!(1));
        let back: ShippingType =
            serde_json::from_value(serde_json::json!(0)).unwrap_or(ShippingType::Pickup);
        assert_eq!(back, ShippingType::Delivery);
    }

    #[test]
    fn unknown_shipping_integer_degrades_to_delivery() {
        let back: ShippingType =
            serde_json::from_value(serde_json::json!(7)).unwrap_or(ShippingType::Pickup);
        assert_eq!(back, ShippingType::Delivery);
    }

    #[test]
    fn owner_storage_keys_are_namespaced() {
        assert_eq!(OwnerId::Guest.storage_key(), "cart-unauthenticated");
        assert_eq!(
            OwnerId::User("u-42".to_owned()).storage_key(),
            "cart-u-42"
        );
    }

    #[test]
    fn identity_without_user_id_is_guest() {
        let identity = Identity {
            logged_in: true,
            user_id: None,
            role: "retail".to_owned(),
        };
        assert_eq!(identity.owner(), OwnerId::Guest);
    }

    #[test]
    fn aggregate_counts_and_lookups() {
        let mut cart = CartAggregate::empty();
        cart.items.push(LineItem::from_catalog(
            CatalogItem {
                id: "a".to_owned(),
                retail_price: 150,
                trade_price: 120,
                ..CatalogItem::default()
            },
            3,
        ));
        cart.items.push(LineItem::from_catalog(
            CatalogItem {
                id: "b".to_owned(),
                retail_price: 500,
                trade_price: 400,
                ..CatalogItem::default()
            },
            1,
        ));
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.quantity_of("a"), 3);
        assert_eq!(cart.quantity_of("missing"), 0);
    }

    #[test]
    fn aggregate_deserializes_with_missing_fields() {
        let blob = serde_json::json!({
            "items": [{"id": "x", "qty": 2}]
        });
        let cart: CartAggregate = serde_json::from_value(blob).unwrap_or_default();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].qty, 2);
        assert_eq!(cart.location_id, "");
        assert_eq!(cart.shipping_type, ShippingType::Delivery);
        // Blobs written before timestamping read back as epoch.
        assert_eq!(cart.updated_at, DateTime::<Utc>::UNIX_EPOCH);
    }
}
