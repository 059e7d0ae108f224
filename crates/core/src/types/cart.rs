//! Cart and product types as returned by the backend.

use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;
use crate::types::price::Price;

/// Flat fee charged when gift wrapping is selected at checkout.
pub const GIFT_WRAP_FEE: Price = Price::from_minor_units(1000);

/// A product listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Public product identifier.
    #[serde(alias = "public_product_id")]
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Primary image URL.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A product reference plus quantity in the user's in-progress order.
///
/// `quantity` is always at least 1; the backend rejects anything lower and
/// the client never sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartLineItem {
    /// Price of the line (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// Response of the cart/wishlist sync endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub cart: Vec<CartLineItem>,
    /// Wishlist entries, passed through untyped.
    #[serde(default)]
    pub wishlist: Vec<serde_json::Value>,
}

/// Amounts shown on the cart summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Price,
    pub gift_wrap: Price,
    pub total: Price,
}

impl CartTotals {
    /// Compute totals for a set of cart lines.
    #[must_use]
    pub fn compute(items: &[CartLineItem], gift_wrap: bool) -> Self {
        let subtotal: Price = items.iter().map(CartLineItem::line_total).sum();
        let gift_wrap = if gift_wrap { GIFT_WRAP_FEE } else { Price::ZERO };
        Self {
            subtotal,
            gift_wrap,
            total: subtotal + gift_wrap,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: &str, minor_units: i64, quantity: u32) -> CartLineItem {
        CartLineItem {
            product: Product {
                id: ProductId::new(id),
                title: format!("Product {id}"),
                price: Price::from_minor_units(minor_units),
                seller: None,
                category: None,
                image: None,
                description: None,
            },
            quantity,
        }
    }

    #[test]
    fn test_snapshot_accepts_public_product_id() {
        let json = r#"{
            "cart": [{
                "product": {
                    "public_product_id": "PRD-1",
                    "title": "Clay Mug",
                    "price": "349.00",
                    "seller": "potter",
                    "category": "kitchen",
                    "image": null
                },
                "quantity": 2
            }],
            "wishlist": [{"product": "PRD-9"}]
        }"#;

        let snapshot: CartSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.cart.len(), 1);
        assert_eq!(snapshot.cart[0].product.id.as_str(), "PRD-1");
        assert_eq!(snapshot.cart[0].quantity, 2);
        assert_eq!(snapshot.wishlist.len(), 1);
    }

    #[test]
    fn test_snapshot_defaults_missing_lists() {
        let snapshot: CartSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.cart.is_empty());
        assert!(snapshot.wishlist.is_empty());
    }

    #[test]
    fn test_totals_without_gift_wrap() {
        let items = vec![line("a", 34_900, 2), line("b", 10_050, 1)];
        let totals = CartTotals::compute(&items, false);
        assert_eq!(totals.subtotal, Price::from_minor_units(79_850));
        assert_eq!(totals.gift_wrap, Price::ZERO);
        assert_eq!(totals.total, totals.subtotal);
    }

    #[test]
    fn test_totals_with_gift_wrap() {
        let items = vec![line("a", 10_000, 1)];
        let totals = CartTotals::compute(&items, true);
        assert_eq!(totals.gift_wrap, Price::from_minor_units(1000));
        assert_eq!(totals.total, Price::from_minor_units(11_000));
    }

    #[test]
    fn test_totals_empty_cart() {
        let totals = CartTotals::compute(&[], false);
        assert_eq!(totals.total, Price::ZERO);
    }
}
