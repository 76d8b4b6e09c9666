use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::InventoryItem;

/// One line in a buyer's cart.
///
/// Product name and price are snapshotted when the line is added; repeated
/// adds of the same product create separate lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    pub id: String,
    pub buyer: String,
    pub product_id: String,
    pub product: String,
    pub quantity: u32,
    pub price: Decimal,
    pub added_at: DateTime<Utc>,
}

/// Query parameters for `POST /add_to_cart`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub buyer: String,
    pub product_id: String,
    pub quantity: i64,
}

/// Query parameters for `DELETE /remove_from_cart`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveFromCartRequest {
    pub buyer: String,
    pub product_id: String,
}

/// Cart line as returned by `GET /view_cart`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntryResponse {
    pub cart_id: String,
    pub product_id: String,
    pub product: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl CartEntry {
    /// Snapshot `item` into a new cart line for `buyer`
    pub fn new(buyer: String, item: &InventoryItem, quantity: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            buyer,
            product_id: item.id.clone(),
            product: item.product.clone(),
            quantity,
            price: item.price,
            added_at: Utc::now(),
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

impl From<CartEntry> for CartEntryResponse {
    fn from(entry: CartEntry) -> Self {
        Self {
            cart_id: entry.id,
            product_id: entry.product_id,
            product: entry.product,
            quantity: entry.quantity,
            price: entry.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pen() -> InventoryItem {
        InventoryItem::new(
            "alice".to_string(),
            "Pen".to_string(),
            dec!(10.50),
            5,
            None,
        )
    }

    #[test]
    fn test_new_entry_snapshots_product() {
        let item = pen();
        let entry = CartEntry::new("bob".to_string(), &item, 2);

        assert_eq!(entry.buyer, "bob");
        assert_eq!(entry.product_id, item.id);
        assert_eq!(entry.product, "Pen");
        assert_eq!(entry.price, dec!(10.50));
        assert_eq!(entry.line_total(), dec!(21.00));
    }

    #[test]
    fn test_repeated_adds_get_distinct_ids() {
        let item = pen();
        let first = CartEntry::new("bob".to_string(), &item, 1);
        let second = CartEntry::new("bob".to_string(), &item, 1);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_response_conversion() {
        let entry = CartEntry::new("bob".to_string(), &pen(), 3);
        let id = entry.id.clone();
        let response = CartEntryResponse::from(entry);
        assert_eq!(response.cart_id, id);
        assert_eq!(response.quantity, 3);
    }
}
