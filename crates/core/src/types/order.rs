//! Order history types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{OrderId, ProductId};
use crate::types::price::Price;
use crate::types::status::OrderStatus;

/// A line on a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The purchased product, if it still exists.
    #[serde(default)]
    pub product: Option<ProductId>,
    #[serde(default)]
    pub title: Option<String>,
    pub quantity: u32,
    pub price_at_purchase: Price,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(alias = "public_order_id")]
    pub id: OrderId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub total_amount: Price,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Orders split into in-progress and finished.
///
/// Every order lands in exactly one of the two lists; an order is past iff
/// its status is terminal (delivered, cancelled or failed). Input order is
/// preserved within each list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderHistory {
    pub current: Vec<Order>,
    pub past: Vec<Order>,
}

impl OrderHistory {
    /// Partition a list of orders by status.
    #[must_use]
    pub fn partition(orders: Vec<Order>) -> Self {
        let (past, current): (Vec<_>, Vec<_>) =
            orders.into_iter().partition(|o| o.status.is_terminal());
        Self { current, past }
    }

    /// Total number of orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.len() + self.past.len()
    }

    /// Whether there are no orders at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.past.is_empty()
    }
}

impl FromIterator<Order> for OrderHistory {
    fn from_iter<I: IntoIterator<Item = Order>>(iter: I) -> Self {
        Self::partition(iter.into_iter().collect())
    }
}
