use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, Instrument};

use super::dynamodb::{
    client_span, datetime_attr, decimal_attr, is_conditional_check_failure, map_dynamodb_error,
    string_attr, Item,
};
use crate::models::{RepositoryError, RepositoryResult, Role, User};

/// Trait defining the interface for user data access operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `ConstraintViolation` if the username is taken.
    async fn create(&self, user: User) -> RepositoryResult<User>;

    /// Find a user by username
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// Atomically add `amount` to a user's savings and return the new balance.
    /// Fails with `NotFound` if the user does not exist.
    async fn add_savings(&self, username: &str, amount: Decimal) -> RepositoryResult<Decimal>;
}

/// DynamoDB implementation of the UserRepository trait
pub struct DynamoDbUserRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbUserRepository {
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

    fn span(&self, operation: &str) -> tracing::Span {
        client_span(&self.table_name, &self.region, operation)
    }

    fn map_error(&self, error: DynamoDbError) -> RepositoryError {
        map_dynamodb_error(&self.table_name, error)
    }
}

/// Convert a User to DynamoDB attribute values
pub fn user_to_item(user: &User) -> Item {
    let mut item = HashMap::new();
    item.insert(
        "username".to_string(),
        AttributeValue::S(user.username.clone()),
    );
    item.insert(
        "password_hash".to_string(),
        AttributeValue::S(user.password_hash.clone()),
    );
    item.insert("role".to_string(), AttributeValue::S(user.role.to_string()));
    item.insert(
        "savings".to_string(),
        AttributeValue::N(user.savings.to_string()),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(user.created_at.to_rfc3339()),
    );
    item
}

/// Convert a DynamoDB item to a User
pub fn item_to_user(item: &Item) -> RepositoryResult<User> {
    let role = string_attr(item, "role")?
        .parse::<Role>()
        .map_err(|message| RepositoryError::InvalidQuery { message })?;

    Ok(User {
        username: string_attr(item, "username")?,
        password_hash: string_attr(item, "password_hash")?,
        role,
        savings: decimal_attr(item, "savings").unwrap_or(Decimal::ZERO),
        created_at: datetime_attr(item, "created_at")?,
    })
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    #[instrument(skip(self, user), fields(table = %self.table_name, username = %user.username))]
    async fn create(&self, user: User) -> RepositoryResult<User> {
        info!("Creating user");

        let item = user_to_item(&user);

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_not_exists(username)")
                .send()
                .await
                .map_err(|e| self.map_error(e.into()))
        }
        .instrument(self.span("PutItem"))
        .await?;

        info!("User created");
        Ok(user)
    }

    #[instrument(skip(self), fields(table = %self.table_name, username = %username))]
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("username", AttributeValue::S(username.to_string()))
                .consistent_read(true)
                .send()
                .await
                .map_err(|e| self.map_error(e.into()))
        }
        .instrument(self.span("GetItem"))
        .await?;

        response.item.as_ref().map(item_to_user).transpose()
    }

    #[instrument(skip(self), fields(table = %self.table_name, username = %username, amount = %amount))]
    async fn add_savings(&self, username: &str, amount: Decimal) -> RepositoryResult<Decimal> {
        info!("Adding to savings");

        let response = async {
            self.client
                .update_item()
                .table_name(&self.table_name)
                .key("username", AttributeValue::S(username.to_string()))
                .update_expression("ADD savings :amount")
                .condition_expression("attribute_exists(username)")
                .expression_attribute_values(":amount", AttributeValue::N(amount.to_string()))
                .return_values(ReturnValue::UpdatedNew)
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
        .instrument(self.span("UpdateItem"))
        .await?;

        let attributes = response.attributes.unwrap_or_default();
        decimal_attr(&attributes, "savings")
    }
}
