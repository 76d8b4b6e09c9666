use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{
    client_span, datetime_attr, decimal_attr, map_dynamodb_error, number_attr, string_attr, Item,
};
use crate::models::{Order, OrderItem, OrderStatus, RepositoryError, RepositoryResult};

/// Read access to committed orders. Orders are only ever written by checkout.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// All orders of a buyer, oldest first
    async fn find_by_buyer(&self, buyer: &str) -> RepositoryResult<Vec<Order>>;
}

/// DynamoDB implementation of the OrderRepository trait.
///
/// Table layout: partition key `buyer`, sort key `id`.
pub struct DynamoDbOrderRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbOrderRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn map_error(&self, error: DynamoDbError) -> RepositoryError {
        map_dynamodb_error(&self.table_name, error)
    }
}

/// Convert an Order to DynamoDB attribute values
pub fn order_to_item(order: &Order) -> Item {
    let mut item = HashMap::new();
    item.insert("buyer".to_string(), AttributeValue::S(order.buyer.clone()));
    item.insert("id".to_string(), AttributeValue::S(order.id.clone()));

    let lines: Vec<AttributeValue> = order
        .items
        .iter()
        .map(|line| {
            let mut line_map = HashMap::new();
            line_map.insert(
                "product_id".to_string(),
                AttributeValue::S(line.product_id.clone()),
            );
            line_map.insert(
                "product".to_string(),
                AttributeValue::S(line.product.clone()),
            );
            line_map.insert(
                "quantity".to_string(),
                AttributeValue::N(line.quantity.to_string()),
            );
            line_map.insert("price".to_string(), AttributeValue::N(line.price.to_string()));
            AttributeValue::M(line_map)
        })
        .collect();

    item.insert("items".to_string(), AttributeValue::L(lines));
    item.insert(
        "total_payment".to_string(),
        AttributeValue::N(order.total_payment.to_string()),
    );
    item.insert(
        "status".to_string(),
        AttributeValue::S(order.status.to_string()),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(order.created_at.to_rfc3339()),
    );
    item
}

/// Convert a DynamoDB item to an Order
pub fn item_to_order(item: &Item) -> RepositoryResult<Order> {
    let lines = item
        .get("items")
        .and_then(|v| v.as_l().ok())
        .ok_or_else(|| RepositoryError::InvalidQuery {
            message: "Missing items".to_string(),
        })?;

    let items = lines
        .iter()
        .map(|line| {
            let line_map = line.as_m().map_err(|_| RepositoryError::InvalidQuery {
                message: "Invalid order line".to_string(),
            })?;
            map_to_order_item(line_map)
        })
        .collect::<RepositoryResult<Vec<_>>>()?;

    let status = string_attr(item, "status")?
        .parse::<OrderStatus>()
        .map_err(|message| RepositoryError::InvalidQuery { message })?;

    Ok(Order {
        id: string_attr(item, "id")?,
        buyer: string_attr(item, "buyer")?,
        items,
        total_payment: decimal_attr(item, "total_payment")?,
        status,
        created_at: datetime_attr(item, "created_at")?,
    })
}

fn map_to_order_item(line: &Item) -> RepositoryResult<OrderItem> {
    Ok(OrderItem {
        product_id: string_attr(line, "product_id")?,
        product: string_attr(line, "product")?,
        quantity: number_attr(line, "quantity")?,
        price: decimal_attr(line, "price")?,
    })
}

#[async_trait]
impl OrderRepository for DynamoDbOrderRepository {
    #[instrument(skip(self), fields(table = %self.table_name, buyer = %buyer))]
    async fn find_by_buyer(&self, buyer: &str) -> RepositoryResult<Vec<Order>> {
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
        .instrument(client_span(&self.table_name, &self.region, "Query"))
        .await?;

        let mut orders: Vec<Order> = raw
            .iter()
            .filter_map(|item| match item_to_order(item) {
                Ok(order) => Some(order),
                Err(e) => {
                    warn!("Failed to parse order: {}", e);
                    None
                }
            })
            .collect();
        orders.sort_by_key(|order| order.created_at);

        info!("Found {} orders", orders.len());
        Ok(orders)
    }
}
