use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, ReturnValue, TransactWriteItem};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{
    build_error, client_span, datetime_attr, decimal_attr, is_cancelled_by_condition,
    is_conditional_check_failure, map_dynamodb_error, number_attr, optional_string_attr,
    string_attr, Item,
};
use crate::models::{InventoryItem, RepositoryError, RepositoryResult};

/// Trait defining the interface for inventory data access operations
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Insert a new listing. Fails with `ConstraintViolation` if the seller
    /// already lists a product with that name.
    async fn create(&self, item: InventoryItem) -> RepositoryResult<InventoryItem>;

    /// Find a listing by its id
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<InventoryItem>>;

    /// All listings of one seller, ordered by product name
    async fn find_by_seller(&self, seller: &str) -> RepositoryResult<Vec<InventoryItem>>;

    /// All listings with a given product name, oldest first
    async fn find_by_product(&self, product: &str) -> RepositoryResult<Vec<InventoryItem>>;

    /// Every listing in the store, oldest first
    async fn find_all(&self) -> RepositoryResult<Vec<InventoryItem>>;

    /// Overwrite price and quantity of a listing. Fails with `NotFound` if
    /// the seller has no such product.
    async fn update_listing(
        &self,
        seller: &str,
        product: &str,
        price: Decimal,
        quantity: u32,
    ) -> RepositoryResult<InventoryItem>;

    /// Delete a listing. Fails with `NotFound` if the seller has no such product.
    async fn delete(&self, seller: &str, product: &str) -> RepositoryResult<()>;
}

/// DynamoDB implementation of the InventoryRepository trait
pub struct DynamoDbInventoryRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
    seller_index: String,
    product_index: String,
}

impl DynamoDbInventoryRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        let seller_index = seller_index_name(&table_name);
        let product_index = product_index_name(&table_name);
        Self {
            client,
            table_name,
            region,
            seller_index,
            product_index,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn seller_index(&self) -> &str {
        &self.seller_index
    }

    pub fn product_index(&self) -> &str {
        &self.product_index
    }

    fn span(&self, operation: &str) -> tracing::Span {
        client_span(&self.table_name, &self.region, operation)
    }

    fn map_error(&self, error: DynamoDbError) -> RepositoryError {
        map_dynamodb_error(&self.table_name, error)
    }

    /// Map a failed conditional write on an existing listing to NotFound
    fn map_missing(&self, error: DynamoDbError) -> RepositoryError {
        if is_conditional_check_failure(&error) {
            RepositoryError::NotFound
        } else {
            self.map_error(error)
        }
    }

    /// Id of the listing currently holding the `(seller, product)` pair
    async fn resolve_listing(&self, seller: &str, product: &str) -> RepositoryResult<Option<String>> {
        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(InventoryItem::listing_key(seller, product)))
                .consistent_read(true)
                .send()
                .await
                .map_err(|e| self.map_error(e.into()))
        }
        .instrument(self.span("GetItem"))
        .await?;

        response
            .item
            .as_ref()
            .map(|item| string_attr(item, "listing_id"))
            .transpose()
    }

    /// Run a paginated query against one of the secondary indexes
    async fn query_index(
        &self,
        index_name: &str,
        key_name: &str,
        key_value: &str,
    ) -> RepositoryResult<Vec<InventoryItem>> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let response = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(index_name)
                .key_condition_expression("#k = :v")
                .expression_attribute_names("#k", key_name)
                .expression_attribute_values(":v", AttributeValue::S(key_value.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| self.map_error(e.into()))?;

            items.extend(parse_items(response.items.unwrap_or_default()));

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }
}

pub fn seller_index_name(table_name: &str) -> String {
    format!("{}-SellerIndex", table_name)
}

pub fn product_index_name(table_name: &str) -> String {
    format!("{}-ProductIndex", table_name)
}

/// Row reserving a seller's product name. It carries neither `seller` nor
/// `product`, so it stays out of both indexes and out of filtered scans.
pub fn listing_guard_item(item: &InventoryItem) -> Item {
    let mut attributes = HashMap::new();
    attributes.insert(
        "id".to_string(),
        AttributeValue::S(InventoryItem::listing_key(&item.seller, &item.product)),
    );
    attributes.insert("listing_id".to_string(), AttributeValue::S(item.id.clone()));
    attributes
}

/// Convert an InventoryItem to DynamoDB attribute values
pub fn inventory_to_item(item: &InventoryItem) -> Item {
    let mut attributes = HashMap::new();
    attributes.insert("id".to_string(), AttributeValue::S(item.id.clone()));
    attributes.insert("seller".to_string(), AttributeValue::S(item.seller.clone()));
    attributes.insert("product".to_string(), AttributeValue::S(item.product.clone()));
    attributes.insert("price".to_string(), AttributeValue::N(item.price.to_string()));
    attributes.insert(
        "quantity".to_string(),
        AttributeValue::N(item.quantity.to_string()),
    );
    if let Some(url) = &item.image_url {
        attributes.insert("image_url".to_string(), AttributeValue::S(url.clone()));
    }
    attributes.insert(
        "created_at".to_string(),
        AttributeValue::S(item.created_at.to_rfc3339()),
    );
    attributes.insert(
        "updated_at".to_string(),
        AttributeValue::S(item.updated_at.to_rfc3339()),
    );
    attributes
}

/// Convert a DynamoDB item to an InventoryItem
pub fn item_to_inventory(item: &Item) -> RepositoryResult<InventoryItem> {
    let created_at = datetime_attr(item, "created_at")?;
    // Older rows may lack updated_at
    let updated_at = datetime_attr(item, "updated_at").unwrap_or(created_at);

    Ok(InventoryItem {
        id: string_attr(item, "id")?,
        seller: string_attr(item, "seller")?,
        product: string_attr(item, "product")?,
        price: decimal_attr(item, "price")?,
        quantity: number_attr(item, "quantity")?,
        image_url: optional_string_attr(item, "image_url"),
        created_at,
        updated_at,
    })
}

fn parse_items(items: Vec<Item>) -> Vec<InventoryItem> {
    items
        .iter()
        .filter_map(|item| match item_to_inventory(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Failed to parse inventory item: {}", e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl InventoryRepository for DynamoDbInventoryRepository {
    #[instrument(skip(self, item), fields(table = %self.table_name, seller = %item.seller, product = %item.product))]
    async fn create(&self, item: InventoryItem) -> RepositoryResult<InventoryItem> {
        info!("Creating inventory item");

        let guard = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(listing_guard_item(&item)))
            .condition_expression("attribute_not_exists(id)")
            .build()
            .map_err(|e| build_error("listing guard put", e))?;
        let listing = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(inventory_to_item(&item)))
            .condition_expression("attribute_not_exists(id)")
            .build()
            .map_err(|e| build_error("listing put", e))?;

        async {
            self.client
                .transact_write_items()
                .transact_items(TransactWriteItem::builder().put(guard).build())
                .transact_items(TransactWriteItem::builder().put(listing).build())
                .send()
                .await
                .map_err(|e| {
                    let error: DynamoDbError = e.into();
                    if is_cancelled_by_condition(&error) {
                        warn!("Seller already lists this product");
                        RepositoryError::ConstraintViolation {
                            message: format!(
                                "Product {} already listed by {}",
                                item.product, item.seller
                            ),
                        }
                    } else {
                        self.map_error(error)
                    }
                })
        }
        .instrument(self.span("TransactWriteItems"))
        .await?;

        info!("Inventory item created with id: {}", item.id);
        Ok(item)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<InventoryItem>> {
        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .consistent_read(true)
                .send()
                .await
                .map_err(|e| self.map_error(e.into()))
        }
        .instrument(self.span("GetItem"))
        .await?;

        // Guard rows share the key space but are not listings
        response
            .item
            .filter(|item| item.contains_key("seller"))
            .as_ref()
            .map(item_to_inventory)
            .transpose()
    }

    #[instrument(skip(self), fields(table = %self.table_name, seller = %seller))]
    async fn find_by_seller(&self, seller: &str) -> RepositoryResult<Vec<InventoryItem>> {
        let mut items = self
            .query_index(&self.seller_index, "seller", seller)
            .instrument(self.span("Query"))
            .await?;
        items.sort_by(|a, b| a.product.cmp(&b.product));

        info!("Found {} items for seller", items.len());
        Ok(items)
    }

    #[instrument(skip(self), fields(table = %self.table_name, product = %product))]
    async fn find_by_product(&self, product: &str) -> RepositoryResult<Vec<InventoryItem>> {
        let mut items = self
            .query_index(&self.product_index, "product", product)
            .instrument(self.span("Query"))
            .await?;
        items.sort_by_key(|item| item.created_at);

        info!("Found {} listings for product", items.len());
        Ok(items)
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self) -> RepositoryResult<Vec<InventoryItem>> {
        let raw = async {
            let mut raw = Vec::new();
            let mut start_key: Option<Item> = None;
            loop {
                let response = self
                    .client
                    .scan()
                    .table_name(&self.table_name)
                    .filter_expression("attribute_exists(seller)")
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
        .instrument(self.span("Scan"))
        .await?;

        let mut items = parse_items(raw);
        items.sort_by_key(|item| item.created_at);

        info!("Found {} inventory items", items.len());
        Ok(items)
    }

    #[instrument(skip(self), fields(table = %self.table_name, seller = %seller, product = %product))]
    async fn update_listing(
        &self,
        seller: &str,
        product: &str,
        price: Decimal,
        quantity: u32,
    ) -> RepositoryResult<InventoryItem> {
        info!("Updating inventory item");

        let id = self
            .resolve_listing(seller, product)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let response = async {
            self.client
                .update_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id))
                .update_expression("SET price = :price, quantity = :quantity, updated_at = :now")
                .condition_expression("attribute_exists(id) AND seller = :seller AND product = :product")
                .expression_attribute_values(":seller", AttributeValue::S(seller.to_string()))
                .expression_attribute_values(":product", AttributeValue::S(product.to_string()))
                .expression_attribute_values(":price", AttributeValue::N(price.to_string()))
                .expression_attribute_values(":quantity", AttributeValue::N(quantity.to_string()))
                .expression_attribute_values(":now", AttributeValue::S(Utc::now().to_rfc3339()))
                .return_values(ReturnValue::AllNew)
                .send()
                .await
                .map_err(|e| self.map_missing(e.into()))
        }
        .instrument(self.span("UpdateItem"))
        .await?;

        let attributes = response.attributes.ok_or(RepositoryError::NotFound)?;
        item_to_inventory(&attributes)
    }

    #[instrument(skip(self), fields(table = %self.table_name, seller = %seller, product = %product))]
    async fn delete(&self, seller: &str, product: &str) -> RepositoryResult<()> {
        info!("Deleting inventory item");

        let id = self
            .resolve_listing(seller, product)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let guard = Delete::builder()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(InventoryItem::listing_key(seller, product)))
            .condition_expression("listing_id = :id")
            .expression_attribute_values(":id", AttributeValue::S(id.clone()))
            .build()
            .map_err(|e| build_error("listing guard delete", e))?;
        let listing = Delete::builder()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id))
            .condition_expression("attribute_exists(id)")
            .build()
            .map_err(|e| build_error("listing delete", e))?;

        async {
            self.client
                .transact_write_items()
                .transact_items(TransactWriteItem::builder().delete(guard).build())
                .transact_items(TransactWriteItem::builder().delete(listing).build())
                .send()
                .await
                .map_err(|e| {
                    let error: DynamoDbError = e.into();
                    if is_cancelled_by_condition(&error) {
                        RepositoryError::NotFound
                    } else {
                        self.map_error(error)
                    }
                })
        }
        .instrument(self.span("TransactWriteItems"))
        .await?;

        info!("Inventory item deleted");
        Ok(())
    }
}
