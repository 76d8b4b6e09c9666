use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::dynamodb::{build_error, map_dynamodb_error};
use super::inventory_repository::{product_index_name, seller_index_name};
use crate::models::{RepositoryError, RepositoryResult};

/// Names of the four storefront tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTables {
    pub users: String,
    pub inventory: String,
    pub orders: String,
    pub carts: String,
}

/// Manages DynamoDB table creation and configuration
pub struct TableManager {
    client: Arc<DynamoDbClient>,
}

fn attribute(name: &str, attribute_type: ScalarAttributeType) -> RepositoryResult<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(attribute_type)
        .build()
        .map_err(|e| build_error("attribute definition", e))
}

fn key(name: &str, key_type: KeyType) -> RepositoryResult<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(|e| build_error("key schema", e))
}

fn index(name: String, hash: &str, range: &str) -> RepositoryResult<GlobalSecondaryIndex> {
    GlobalSecondaryIndex::builder()
        .index_name(name)
        .key_schema(key(hash, KeyType::Hash)?)
        .key_schema(key(range, KeyType::Range)?)
        .projection(
            Projection::builder()
                .projection_type(ProjectionType::All)
                .build(),
        )
        .build()
        .map_err(|e| build_error("GSI", e))
}

impl TableManager {
    /// Create a new table manager
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self { client }
    }

    /// Create the users table, keyed by username
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_users_table(&self, table_name: &str) -> RepositoryResult<()> {
        self.create_table(
            table_name,
            vec![attribute("username", ScalarAttributeType::S)?],
            vec![key("username", KeyType::Hash)?],
            Vec::new(),
        )
        .await
    }

    /// Create the inventory table with seller and product GSIs
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_inventory_table(&self, table_name: &str) -> RepositoryResult<()> {
        self.create_table(
            table_name,
            vec![
                attribute("id", ScalarAttributeType::S)?,
                attribute("seller", ScalarAttributeType::S)?,
                attribute("product", ScalarAttributeType::S)?,
            ],
            vec![key("id", KeyType::Hash)?],
            vec![
                index(seller_index_name(table_name), "seller", "product")?,
                index(product_index_name(table_name), "product", "seller")?,
            ],
        )
        .await
    }

    /// Create the orders table, partitioned by buyer
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_orders_table(&self, table_name: &str) -> RepositoryResult<()> {
        self.create_buyer_partitioned_table(table_name).await
    }

    /// Create the carts table, partitioned by buyer
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_carts_table(&self, table_name: &str) -> RepositoryResult<()> {
        self.create_buyer_partitioned_table(table_name).await
    }

    async fn create_buyer_partitioned_table(&self, table_name: &str) -> RepositoryResult<()> {
        self.create_table(
            table_name,
            vec![
                attribute("buyer", ScalarAttributeType::S)?,
                attribute("id", ScalarAttributeType::S)?,
            ],
            vec![key("buyer", KeyType::Hash)?, key("id", KeyType::Range)?],
            Vec::new(),
        )
        .await
    }

    async fn create_table(
        &self,
        table_name: &str,
        attribute_definitions: Vec<AttributeDefinition>,
        key_schema: Vec<KeySchemaElement>,
        indexes: Vec<GlobalSecondaryIndex>,
    ) -> RepositoryResult<()> {
        if self.table_exists(table_name).await? {
            info!("Table {} already exists", table_name);
            return Ok(());
        }

        info!("Creating table {}", table_name);

        let indexes = if indexes.is_empty() { None } else { Some(indexes) };

        self.client
            .create_table()
            .table_name(table_name)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema))
            .set_global_secondary_indexes(indexes)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| map_dynamodb_error(table_name, e.into()))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(table_name).await?;
        info!("Table {} created successfully", table_name);

        Ok(())
    }

    /// Check if a table exists
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => match DynamoDbError::from(e) {
                DynamoDbError::ResourceNotFoundException(_) => {
                    info!("Table {} does not exist", table_name);
                    Ok(false)
                }
                other => {
                    error!("Error checking table existence: {}", other);
                    Err(RepositoryError::ConnectionFailed)
                }
            },
        }
    }

    /// Wait for a table to become active
    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        let mut attempts = 0;
        let max_attempts = 30;
        let wait_duration = Duration::from_secs(2);

        loop {
            let response = self
                .client
                .describe_table()
                .table_name(table_name)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(table_name, e.into()))?;

            match response.table.and_then(|table| table.table_status) {
                Some(TableStatus::Active) => {
                    info!("Table {} is now active", table_name);
                    return Ok(());
                }
                Some(status) => info!("Table {} status: {:?}, waiting...", table_name, status),
                None => warn!("Table {} status unknown, waiting...", table_name),
            }

            attempts += 1;
            if attempts >= max_attempts {
                error!("Timeout waiting for table {} to become active", table_name);
                return Err(RepositoryError::Timeout);
            }

            tokio::time::sleep(wait_duration).await;
        }
    }

    /// Create all four tables concurrently
    #[instrument(skip(self))]
    pub async fn create_all_tables(&self, tables: &StoreTables) -> RepositoryResult<()> {
        info!("Creating all tables");

        let (users, inventory, orders, carts) = tokio::join!(
            self.create_users_table(&tables.users),
            self.create_inventory_table(&tables.inventory),
            self.create_orders_table(&tables.orders),
            self.create_carts_table(&tables.carts),
        );

        users?;
        inventory?;
        orders?;
        carts?;

        info!("All tables ready");
        Ok(())
    }
}
