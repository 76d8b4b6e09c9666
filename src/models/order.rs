use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CartEntry, OrderStatus};

/// A purchased cart line, frozen into an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub product: String,
    pub quantity: u32,
    pub price: Decimal,
}

/// A committed purchase. Orders are immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub buyer: String,
    pub items: Vec<OrderItem>,
    pub total_payment: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Order as returned by `GET /view_orders`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub items: Vec<OrderItem>,
    pub total_payment: Decimal,
    pub status: OrderStatus,
}

/// Outcome of `POST /place_order`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedResponse {
    pub message: String,
    pub order_id: String,
    pub total_payment: Decimal,
}

impl From<&CartEntry> for OrderItem {
    fn from(entry: &CartEntry) -> Self {
        Self {
            product_id: entry.product_id.clone(),
            product: entry.product.clone(),
            quantity: entry.quantity,
            price: entry.price,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            items: order.items,
            total_payment: order.total_payment,
            status: order.status,
        }
    }
}
