use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{
    client_span, datetime_attr, decimal_attr, is_conditional_check_failure, map_dynamodb_error,
    number_attr, string_attr, Item,
};
use crate::models::{CartEntry, RepositoryError, RepositoryResult};

/// Trait defining the interface for cart data access operations
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Append a cart line
    async fn add_entry(&self, entry: CartEntry) -> RepositoryResult<CartEntry>;

    /// All cart lines of a buyer, oldest first
    async fn find_by_buyer(&self, buyer: &str) -> RepositoryResult<Vec<CartEntry>>;

    /// Delete one cart line. Fails with `NotFound` if it no longer exists.
    async fn delete_entry(&self, buyer: &str, entry_id: &str) -> RepositoryResult<()>;
}

/// DynamoDB implementation of the CartRepository trait.
///
/// Table layout: partition key `buyer`, sort key `id`.
pub struct DynamoDbCartRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbCartRepository {
    /// Create a new DynamoDB cart repository
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    /// Get the table name (for testing)
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn span(&self, operation: &str) -> tracing::Span {
        client_span(&self.table_name, &self.region, operation)
    }

    fn map_error(&self, error: DynamoDbError) -> RepositoryError {
        map_dynamodb_error(&self.table_name, error)
    }
}

/// Primary key of a cart line
pub fn cart_entry_key(buyer: &str, entry_id: &str) -> Item {
    let mut key = HashMap::new();
    key.insert("buyer".to_string(), AttributeValue::S(buyer.to_string()));
    key.insert("id".to_string(), AttributeValue::S(entry_id.to_string()));
    key
}

/// Convert a CartEntry to DynamoDB attribute values
pub fn cart_entry_to_item(entry: &CartEntry) -> Item {
    let mut item = cart_entry_key(&entry.buyer, &entry.id);
    item.insert(
        "product_id".to_string(),
        AttributeValue::S(entry.product_id.clone()),
    );
    item.insert(
        "product".to_string(),
        AttributeValue::S(entry.product.clone()),
    );
    item.insert(
        "quantity".to_string(),
        AttributeValue::N(entry.quantity.to_string()),
    );
    item.insert("price".to_string(), AttributeValue::N(entry.price.to_string()));
    item.insert(
        "added_at".to_string(),
        AttributeValue::S(entry.added_at.to_rfc3339()),
    );
    item
}

/// Convert a DynamoDB item to a CartEntry
pub fn item_to_cart_entry(item: &Item) -> RepositoryResult<CartEntry> {
    Ok(CartEntry {
        id: string_attr(item, "id")?,
        buyer: string_attr(item, "buyer")?,
        product_id: string_attr(item, "product_id")?,
        product: string_attr(item, "product")?,
        quantity: number_attr(item, "quantity")?,
        price: decimal_attr(item, "price")?,
        added_at: datetime_attr(item, "added_at")?,
    })
}

#[async_trait]
impl CartRepository for DynamoDbCartRepository {
    #[instrument(skip(self, entry), fields(table = %self.table_name, buyer = %entry.buyer, product_id = %entry.product_id))]
    async fn add_entry(&self, entry: CartEntry) -> RepositoryResult<CartEntry> {
        info!("Adding cart entry");

        let item = cart_entry_to_item(&entry);

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .send()
                .await
                .map_err(|e| self.map_error(e.into()))
        }
        .instrument(self.span("PutItem"))
        .await?;

        info!("Cart entry added with id: {}", entry.id);
        Ok(entry)
    }

    #[instrument(skip(self), fields(table = %self.table_name, buyer = %buyer))]
    async fn find_by_buyer(&self, buyer: &str) -> RepositoryResult<Vec<CartEntry>> {
        let raw = async {
            let mut raw = Vec::new();
            let mut start_key: Option<Item> = None;
            loop {
                let response = self
                    .client
                    .query()
                    .table_name(&self.table_name)
                    .key_condition_expression("buyer = :buyer")
                    .expression_attribute_values(":buyer", AttributeValue::S(buyer.to_string()))
                    .consistent_read(true)
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(|e| self.map_error(e.into()))?;

                raw.extend(response.items.unwrap_or_default());

                match response.last_evaluated_key {
                    Some(key) if !key.is_empty() => start_key = Some(key),
                    _ => break,
                }
            }
            Ok::<_, RepositoryError>(raw)
        }
        .instrument(self.span("Query"))
        .await?;

        let mut entries: Vec<CartEntry> = raw
            .iter()
            .filter_map(|item| match item_to_cart_entry(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Failed to parse cart entry: {}", e);
                    None
                }
            })
            .collect();
        entries.sort_by_key(|entry| entry.added_at);

        info!("Found {} cart entries", entries.len());
        Ok(entries)
    }

    #[instrument(skip(self), fields(table = %self.table_name, buyer = %buyer, entry_id = %entry_id))]
    async fn delete_entry(&self, buyer: &str, entry_id: &str) -> RepositoryResult<()> {
        info!("Deleting cart entry");

        async {
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .set_key(Some(cart_entry_key(buyer, entry_id)))
                .condition_expression("attribute_exists(id)")
                .send()
                .await
                .map_err(|e| {
                    let error: DynamoDbError = e.into();
                    if is_conditional_check_failure(&error) {
                        RepositoryError::NotFound
                    } else {
                        self.map_error(error)
                    }
                })
        }
        .instrument(self.span("DeleteItem"))
        .await?;

        info!("Cart entry deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InventoryItem;
    use rust_decimal_macros::dec;

    fn create_test_entry() -> CartEntry {
        let pen = InventoryItem::new(
            "alice".to_string(),
            "Pen".to_string(),
            dec!(12.99),
            5,
            None,
        );
        CartEntry::new("bob".to_string(), &pen, 2)
    }

    #[test]
    fn test_cart_entry_to_item_conversion() {
        let entry = create_test_entry();
        let item = cart_entry_to_item(&entry);

        assert!(item.contains_key("buyer"));
        assert!(item.contains_key("id"));
        assert!(item.contains_key("product_id"));
        assert!(item.contains_key("added_at"));

        if let Some(AttributeValue::S(buyer)) = item.get("buyer") {
            assert_eq!(buyer, "bob");
        } else {
            panic!("Expected string value for buyer");
        }

        if let Some(AttributeValue::N(price)) = item.get("price") {
            assert_eq!(price, "12.99");
        } else {
            panic!("Expected number value for price");
        }
    }

    #[test]
    fn test_item_to_cart_entry_conversion() {
        let entry = create_test_entry();
        let converted = item_to_cart_entry(&cart_entry_to_item(&entry)).unwrap();

        assert_eq!(converted.id, entry.id);
        assert_eq!(converted.product, "Pen");
        assert_eq!(converted.quantity, 2);
        assert_eq!(converted.price, dec!(12.99));

        let time_diff = (converted.added_at - entry.added_at)
            .num_milliseconds()
            .abs();
        assert!(time_diff < 1000, "Timestamp difference too large: {}ms", time_diff);
    }

    #[test]
    fn test_invalid_cart_entry_handling() {
        let mut item = HashMap::new();
        item.insert("buyer".to_string(), AttributeValue::S("bob".to_string()));
        item.insert("quantity".to_string(), AttributeValue::N("3".to_string()));

        match item_to_cart_entry(&item) {
            Err(RepositoryError::InvalidQuery { message }) => {
                assert!(message.contains("Missing id"));
            }
            other => panic!("Expected InvalidQuery error, got {:?}", other),
        }
    }

    #[test]
    fn test_repository_creation() {
        let config = aws_sdk_dynamodb::Config::builder()
            .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        let client = Arc::new(aws_sdk_dynamodb::Client::from_conf(config));
        let repo = DynamoDbCartRepository::new(
            client,
            "test-cart-table".to_string(),
            "us-east-1".to_string(),
        );

        assert_eq!(repo.table_name(), "test-cart-table");
    }
}
