use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, TransactWriteItem, Update};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::cart_repository::cart_entry_key;
use super::dynamodb::{build_error, client_span, map_dynamodb_error};
use super::order_repository::order_to_item;
use super::table_manager::StoreTables;
use crate::models::{CheckoutPlan, CheckoutRejection, RepositoryError, RepositoryResult};

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";
const TRANSACTION_CONFLICT: &str = "TransactionConflict";

/// Commits a priced checkout as one all-or-nothing unit of work
#[async_trait]
pub trait CheckoutRepository: Send + Sync {
    /// Decrement stock, debit savings, record the order and clear the priced
    /// cart lines. Any failed guard rejects the whole plan with
    /// `CheckoutRejected` and leaves the store untouched.
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> RepositoryResult<()>;
}

/// DynamoDB implementation backed by `TransactWriteItems`
pub struct DynamoDbCheckoutRepository {
    client: Arc<DynamoDbClient>,
    tables: StoreTables,
    region: String,
}

impl DynamoDbCheckoutRepository {
    pub fn new(client: Arc<DynamoDbClient>, tables: StoreTables, region: String) -> Self {
        Self {
            client,
            tables,
            region,
        }
    }

    /// Build the transaction items in a fixed layout: stock decrements,
    /// savings debit, order put, cart deletes.
    pub fn build_transaction(&self, plan: &CheckoutPlan) -> RepositoryResult<Vec<TransactWriteItem>> {
        let now = Utc::now().to_rfc3339();
        let mut items = Vec::with_capacity(plan.transaction_items());

        for decrement in &plan.decrements {
            let update = Update::builder()
                .table_name(&self.tables.inventory)
                .key("id", AttributeValue::S(decrement.product_id.clone()))
                .update_expression("SET quantity = quantity - :q, updated_at = :now")
                .condition_expression("attribute_exists(id) AND quantity >= :q")
                .expression_attribute_values(":q", AttributeValue::N(decrement.quantity.to_string()))
                .expression_attribute_values(":now", AttributeValue::S(now.clone()))
                .build()
                .map_err(|e| build_error("stock decrement", e))?;
            items.push(TransactWriteItem::builder().update(update).build());
        }

        let debit = Update::builder()
            .table_name(&self.tables.users)
            .key("username", AttributeValue::S(plan.buyer.clone()))
            .update_expression("SET savings = savings - :total")
            .condition_expression("attribute_exists(username) AND savings >= :total")
            .expression_attribute_values(":total", AttributeValue::N(plan.total().to_string()))
            .build()
            .map_err(|e| build_error("savings debit", e))?;
        items.push(TransactWriteItem::builder().update(debit).build());

        let order = Put::builder()
            .table_name(&self.tables.orders)
            .set_item(Some(order_to_item(&plan.order)))
            .condition_expression("attribute_not_exists(id)")
            .build()
            .map_err(|e| build_error("order put", e))?;
        items.push(TransactWriteItem::builder().put(order).build());

        for entry_id in &plan.cart_entry_ids {
            let delete = Delete::builder()
                .table_name(&self.tables.carts)
                .set_key(Some(cart_entry_key(&plan.buyer, entry_id)))
                .condition_expression("attribute_exists(id)")
                .build()
                .map_err(|e| build_error("cart delete", e))?;
            items.push(TransactWriteItem::builder().delete(delete).build());
        }

        Ok(items)
    }

    fn span(&self) -> tracing::Span {
        let tables = format!(
            "{},{},{},{}",
            self.tables.inventory, self.tables.users, self.tables.orders, self.tables.carts
        );
        client_span(&tables, &self.region, "TransactWriteItems")
    }
}

/// Translate per-item cancellation codes back into the guard that failed.
///
/// `codes` follows the layout produced by `build_transaction`.
pub fn classify_cancellation(plan: &CheckoutPlan, codes: &[Option<String>]) -> RepositoryError {
    let decrements = plan.decrements.len();
    let debit = decrements;
    let order = decrements + 1;

    let failed = codes
        .iter()
        .position(|code| code.as_deref() == Some(CONDITIONAL_CHECK_FAILED));

    match failed {
        Some(index) if index < decrements => RepositoryError::CheckoutRejected {
            reason: CheckoutRejection::InsufficientStock {
                product_id: plan.decrements[index].product_id.clone(),
            },
        },
        Some(index) if index == debit => RepositoryError::CheckoutRejected {
            reason: CheckoutRejection::InsufficientFunds,
        },
        Some(index) if index == order => RepositoryError::TransactionFailed {
            message: format!("Order {} already exists", plan.order.id),
        },
        Some(_) => RepositoryError::CheckoutRejected {
            reason: CheckoutRejection::CartChanged,
        },
        None if codes
            .iter()
            .any(|code| code.as_deref() == Some(TRANSACTION_CONFLICT)) =>
        {
            RepositoryError::ConstraintViolation {
                message: "Checkout conflicted with a concurrent transaction".to_string(),
            }
        }
        None => RepositoryError::TransactionFailed {
            message: format!(
                "Transaction cancelled: [{}]",
                codes
                    .iter()
                    .map(|code| code.as_deref().unwrap_or("None"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        },
    }
}

#[async_trait]
impl CheckoutRepository for DynamoDbCheckoutRepository {
    #[instrument(skip(self, plan), fields(buyer = %plan.buyer, order_id = %plan.order.id, total = %plan.total()))]
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> RepositoryResult<()> {
        if !plan.fits_in_transaction() {
            return Err(RepositoryError::InvalidQuery {
                message: format!(
                    "Checkout needs {} writes, more than one transaction can hold",
                    plan.transaction_items()
                ),
            });
        }

        let items = self.build_transaction(plan)?;
        info!("Committing checkout with {} writes", items.len());

        async {
            self.client
                .transact_write_items()
                .set_transact_items(Some(items))
                .client_request_token(plan.order.id.clone())
                .send()
                .await
                .map_err(|e| {
                    let error: DynamoDbError = e.into();
                    match &error {
                        DynamoDbError::TransactionCanceledException(cancelled) => {
                            let codes: Vec<Option<String>> = cancelled
                                .cancellation_reasons()
                                .iter()
                                .map(|reason| reason.code().map(str::to_string))
                                .collect();
                            let mapped = classify_cancellation(plan, &codes);
                            warn!("Checkout transaction cancelled: {}", mapped);
                            mapped
                        }
                        _ => map_dynamodb_error(&self.tables.orders, error),
                    }
                })
        }
        .instrument(self.span())
        .await?;

        info!("Checkout committed");
        Ok(())
    }
}
