use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::ServiceKind;
use crate::repositories::StoreTables;

/// Prefix of every environment variable the services read
pub const ENV_PREFIX: &str = "STOREFRONT";

/// Lowest PBKDF2 iteration count the services accept
pub const MIN_PASSWORD_HASH_ROUNDS: u32 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
    pub max_request_size: usize,
}

/// Raw server settings before the per-service port is resolved
#[derive(Debug, Deserialize)]
struct ServerSettings {
    #[serde(default = "default_host")]
    host: String,
    port: Option<u16>,
    auth_port: Option<u16>,
    buyer_port: Option<u16>,
    seller_port: Option<u16>,
    #[serde(default = "default_timeout")]
    request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    max_request_size: usize,
}

/// Which store implementation backs the repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[serde(rename = "dynamodb")]
    DynamoDb,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,
    #[serde(default = "default_users_table")]
    pub users_table_name: String,
    #[serde(default = "default_inventory_table")]
    pub inventory_table_name: String,
    #[serde(default = "default_orders_table")]
    pub orders_table_name: String,
    #[serde(default = "default_carts_table")]
    pub carts_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Local DynamoDB endpoint, e.g. `http://localhost:8000`
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub auto_create_tables: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_password_hash_rounds")]
    pub password_hash_rounds: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityConfig {
    pub service_name: String,
    pub service_version: String,
    pub otlp_endpoint: Option<String>,
    pub log_level: String,
    pub enable_json_logging: bool,
}

#[derive(Debug, Deserialize)]
struct ObservabilitySettings {
    service_name: Option<String>,
    #[serde(default = "default_service_version")]
    service_version: String,
    #[serde(default)]
    otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    enable_json_logging: bool,
}

impl Config {
    /// Load `STOREFRONT_*` environment variables for one service
    pub fn from_environment(kind: ServiceKind) -> Result<Self, ConfigError> {
        Self::from_source(kind, config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from an explicit environment source; tests pass a fixed map
    pub fn from_source(
        kind: ServiceKind,
        environment: config::Environment,
    ) -> Result<Self, ConfigError> {
        info!("Loading configuration for {} service", kind);

        let settings = config::Config::builder()
            .add_source(environment)
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to load configuration: {}", e),
            })?;

        let config = Config {
            server: ServerConfig::from_settings(&settings, kind)?,
            database: deserialize_section(&settings, "database")?,
            security: deserialize_section(&settings, "security")?,
            observability: ObservabilityConfig::from_settings(&settings, kind)?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::ValidationError {
                message: message.to_string(),
            })
        };

        if self.server.port == 0 {
            return invalid("Server port cannot be 0");
        }

        if self.server.request_timeout_seconds == 0 {
            return invalid("Request timeout cannot be 0");
        }

        if self.server.max_request_size == 0 {
            return invalid("Max request size cannot be 0");
        }

        let tables = self.database.tables();
        for (name, value) in [
            ("Users", &tables.users),
            ("Inventory", &tables.inventory),
            ("Orders", &tables.orders),
            ("Carts", &tables.carts),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: format!("{} table name cannot be empty", name),
                });
            }
        }

        if self.security.password_hash_rounds < MIN_PASSWORD_HASH_ROUNDS {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Password hash rounds must be at least {}",
                    MIN_PASSWORD_HASH_ROUNDS
                ),
            });
        }

        Ok(())
    }
}

fn deserialize_section<T: serde::de::DeserializeOwned>(
    settings: &config::Config,
    section: &str,
) -> Result<T, ConfigError> {
    settings
        .clone()
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl ServerConfig {
    fn from_settings(settings: &config::Config, kind: ServiceKind) -> Result<Self, ConfigError> {
        let raw: ServerSettings = deserialize_section(settings, "server")?;

        // Service-specific port, then the shared port, then the built-in default
        let service_port = match kind {
            ServiceKind::Auth => raw.auth_port,
            ServiceKind::Buyer => raw.buyer_port,
            ServiceKind::Seller => raw.seller_port,
        };

        Ok(ServerConfig {
            host: raw.host,
            port: service_port
                .or(raw.port)
                .unwrap_or_else(|| kind.default_port()),
            request_timeout_seconds: raw.request_timeout_seconds,
            max_request_size: raw.max_request_size,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    pub fn tables(&self) -> StoreTables {
        StoreTables {
            users: self.users_table_name.clone(),
            inventory: self.inventory_table_name.clone(),
            orders: self.orders_table_name.clone(),
            carts: self.carts_table_name.clone(),
        }
    }
}

impl ObservabilityConfig {
    fn from_settings(settings: &config::Config, kind: ServiceKind) -> Result<Self, ConfigError> {
        let raw: ObservabilitySettings = deserialize_section(settings, "observability")?;

        Ok(ObservabilityConfig {
            service_name: raw
                .service_name
                .unwrap_or_else(|| default_service_name(kind)),
            service_version: raw.service_version,
            otlp_endpoint: raw.otlp_endpoint.filter(|endpoint| !endpoint.trim().is_empty()),
            log_level: raw.log_level,
            enable_json_logging: raw.enable_json_logging,
        })
    }
}

pub(crate) fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

pub(crate) fn default_store_backend() -> StoreBackend {
    StoreBackend::DynamoDb
}

pub(crate) fn default_users_table() -> String {
    "StorefrontUsers".to_string()
}

pub(crate) fn default_inventory_table() -> String {
    "StorefrontInventory".to_string()
}

pub(crate) fn default_orders_table() -> String {
    "StorefrontOrders".to_string()
}

pub(crate) fn default_carts_table() -> String {
    "StorefrontCarts".to_string()
}

pub(crate) fn default_region() -> String {
    "us-east-1".to_string()
}

pub(crate) fn default_password_hash_rounds() -> u32 {
    100_000
}

pub(crate) fn default_service_name(kind: ServiceKind) -> String {
    format!("storefront-{}", kind)
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests;
