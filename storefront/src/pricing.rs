//! Role-based pricing.
//!
//! Every account resolves to exactly one [`Role`], and the role alone picks
//! which price field of a line item counts. Cart totals are always derived
//! from the line items through [`Role::total`]; no code path accepts a total
//! from input or storage.

use crate::types::LineItem;

/// Pricing tier of the active account.
///
/// The identity layer reports roles as free-form strings; anything that is
/// not recognizably a trade account prices as retail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    Retail,
    Trade,
}

impl Role {
    /// Normalizes a raw role string from the identity layer.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trade" | "wholesale" => Role::Trade,
            "retail" | "" => Role::Retail,
            other => {
                tracing::debug!(role = other, "unrecognized account role, pricing as retail");
                Role::Retail
            }
        }
    }

    /// The unit price of `item` under this role, in minor currency units.
    pub const fn unit_price(self, item: &LineItem) -> i64 {
        match self {
            Role::Retail => item.retail_price,
            Role::Trade => item.trade_price,
        }
    }

    /// Sums `unit_price * qty` over all lines.
    pub fn total(self, items: &[LineItem]) -> i64 {
        items
            .iter()
            .map(|item| self.unit_price(item).saturating_mul(i64::from(item.qty)))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CatalogItem;

    fn line(id: &str, retail: i64, trade: i64, qty: u32) -> LineItem {
        LineItem::from_catalog(
            CatalogItem {
                id: id.to_owned(),
                retail_price: retail,
                trade_price: trade,
                ..CatalogItem::default()
            },
            qty,
        )
    }

    #[test]
    fn parse_is_lenient() {
        assert_eq!(Role::parse("trade"), Role::Trade);
        assert_eq!(Role::parse(" Trade "), Role::Trade);
        assert_eq!(Role::parse("wholesale"), Role::Trade);
        assert_eq!(Role::parse("retail"), Role::Retail);
        assert_eq!(Role::parse(""), Role::Retail);
        assert_eq!(Role::parse("something-new"), Role::Retail);
    }

    #[test]
    fn totals_follow_the_role() {
        let items = vec![line("a", 150, 120, 2), line("b", 500, 400, 1)];
        assert_eq!(Role::Retail.total(&items), 800);
        assert_eq!(Role::Trade.total(&items), 640);
    }

    #[test]
    fn empty_cart_totals_zero() {
        assert_eq!(Role::Retail.total(&[]), 0);
        assert_eq!(Role::Trade.total(&[]), 0);
    }
}
