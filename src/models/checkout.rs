use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{CartEntry, Order, OrderItem, OrderStatus};

/// Upper bound on the writes a single checkout transaction may carry
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// Stock to take from one inventory row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: String,
    pub product: String,
    pub quantity: u32,
}

/// Everything a checkout commits in one unit of work.
///
/// Cart lines for the same product are folded into one decrement, since the
/// store may not touch a row twice inside a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutPlan {
    pub buyer: String,
    pub order: Order,
    pub decrements: Vec<StockDecrement>,
    pub cart_entry_ids: Vec<String>,
}

impl CheckoutPlan {
    /// Price `entries` into a plan. Returns `None` for an empty cart.
    pub fn from_cart(buyer: &str, entries: &[CartEntry]) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }

        let mut by_product: BTreeMap<&str, StockDecrement> = BTreeMap::new();
        for entry in entries {
            by_product
                .entry(entry.product_id.as_str())
                .and_modify(|d| d.quantity = d.quantity.saturating_add(entry.quantity))
                .or_insert_with(|| StockDecrement {
                    product_id: entry.product_id.clone(),
                    product: entry.product.clone(),
                    quantity: entry.quantity,
                });
        }

        let total_payment = entries.iter().map(CartEntry::line_total).sum();

        let order = Order {
            id: Uuid::new_v4().to_string(),
            buyer: buyer.to_string(),
            items: entries.iter().map(OrderItem::from).collect(),
            total_payment,
            status: OrderStatus::Placed,
            created_at: Utc::now(),
        };

        Some(Self {
            buyer: buyer.to_string(),
            order,
            decrements: by_product.into_values().collect(),
            cart_entry_ids: entries.iter().map(|e| e.id.clone()).collect(),
        })
    }

    pub fn total(&self) -> Decimal {
        self.order.total_payment
    }

    /// Writes needed: one per decrement, one per cart line, the debit and the order
    pub fn transaction_items(&self) -> usize {
        self.decrements.len() + self.cart_entry_ids.len() + 2
    }

    pub fn fits_in_transaction(&self) -> bool {
        self.transaction_items() <= MAX_TRANSACTION_ITEMS
    }
}
