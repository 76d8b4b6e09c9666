#[cfg(test)]
mod config_tests {
    use crate::config::{
        default_carts_table, default_host, default_inventory_table, default_log_level,
        default_max_request_size, default_orders_table, default_password_hash_rounds,
        default_region, default_service_name, default_timeout, default_users_table, Config,
        ConfigError, ServerConfig, StoreBackend, ENV_PREFIX,
    };
    use crate::models::ServiceKind;
    use std::time::Duration;

    /// Environment source over a fixed set of variables, so tests never race
    /// on the process environment
    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let source: config::Map<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    fn load(kind: ServiceKind, vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        Config::from_source(kind, environment(vars))
    }

    #[test]
    fn test_defaults() {
        let config = load(ServiceKind::Buyer, &[]).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.request_timeout_seconds, 30);
        assert_eq!(config.server.max_request_size, 1024 * 1024);

        assert_eq!(config.database.store_backend, StoreBackend::DynamoDb);
        assert_eq!(config.database.users_table_name, "StorefrontUsers");
        assert_eq!(config.database.inventory_table_name, "StorefrontInventory");
        assert_eq!(config.database.orders_table_name, "StorefrontOrders");
        assert_eq!(config.database.carts_table_name, "StorefrontCarts");
        assert_eq!(config.database.endpoint_url, None);
        assert!(!config.database.auto_create_tables);

        assert_eq!(config.security.password_hash_rounds, 100_000);

        assert_eq!(config.observability.service_name, "storefront-buyer");
        assert_eq!(config.observability.otlp_endpoint, None);
        assert!(!config.observability.enable_json_logging);
    }

    #[test]
    fn test_port_resolution_per_service() {
        assert_eq!(load(ServiceKind::Auth, &[]).unwrap().server.port, 8002);
        assert_eq!(load(ServiceKind::Seller, &[]).unwrap().server.port, 8001);

        let shared = [("STOREFRONT_PORT", "9000")];
        assert_eq!(load(ServiceKind::Auth, &shared).unwrap().server.port, 9000);

        let specific = [
            ("STOREFRONT_PORT", "9000"),
            ("STOREFRONT_SELLER_PORT", "9101"),
        ];
        assert_eq!(load(ServiceKind::Seller, &specific).unwrap().server.port, 9101);
        assert_eq!(load(ServiceKind::Buyer, &specific).unwrap().server.port, 9000);
    }

    #[test]
    fn test_database_config_from_env() {
        let config = load(
            ServiceKind::Buyer,
            &[
                ("STOREFRONT_STORE_BACKEND", "memory"),
                ("STOREFRONT_USERS_TABLE_NAME", "TestUsers"),
                ("STOREFRONT_CARTS_TABLE_NAME", "TestCarts"),
                ("STOREFRONT_REGION", "eu-west-1"),
                ("STOREFRONT_ENDPOINT_URL", "http://localhost:8000"),
                ("STOREFRONT_AUTO_CREATE_TABLES", "true"),
            ],
        )
        .unwrap();

        assert_eq!(config.database.store_backend, StoreBackend::Memory);
        assert_eq!(config.database.region, "eu-west-1");
        assert_eq!(
            config.database.endpoint_url.as_deref(),
            Some("http://localhost:8000")
        );
        assert!(config.database.auto_create_tables);

        let tables = config.database.tables();
        assert_eq!(tables.users, "TestUsers");
        assert_eq!(tables.carts, "TestCarts");
        assert_eq!(tables.orders, "StorefrontOrders");
    }

    #[test]
    fn test_observability_config_from_env() {
        let config = load(
            ServiceKind::Auth,
            &[
                ("STOREFRONT_SERVICE_NAME", "auth-under-test"),
                ("STOREFRONT_OTLP_ENDPOINT", "http://collector:4317"),
                ("STOREFRONT_LOG_LEVEL", "debug"),
                ("STOREFRONT_ENABLE_JSON_LOGGING", "true"),
            ],
        )
        .unwrap();

        assert_eq!(config.observability.service_name, "auth-under-test");
        assert_eq!(
            config.observability.otlp_endpoint.as_deref(),
            Some("http://collector:4317")
        );
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.observability.enable_json_logging);
    }

    #[test]
    fn test_blank_otlp_endpoint_disables_export() {
        let config = load(ServiceKind::Auth, &[("STOREFRONT_OTLP_ENDPOINT", " ")]).unwrap();
        assert_eq!(config.observability.otlp_endpoint, None);
    }

    #[test]
    fn test_validation_failures() {
        let cases: [&[(&str, &str)]; 4] = [
            &[("STOREFRONT_PORT", "0")],
            &[("STOREFRONT_REQUEST_TIMEOUT_SECONDS", "0")],
            &[("STOREFRONT_ORDERS_TABLE_NAME", " ")],
            &[("STOREFRONT_PASSWORD_HASH_ROUNDS", "999")],
        ];

        for vars in cases {
            match load(ServiceKind::Buyer, vars) {
                Err(ConfigError::ValidationError { .. }) => {}
                other => panic!("Expected validation error for {:?}, got {:?}", vars, other),
            }
        }
    }

    #[test]
    fn test_unparseable_values_are_load_errors() {
        let result = load(ServiceKind::Buyer, &[("STOREFRONT_STORE_BACKEND", "postgres")]);
        assert!(matches!(result, Err(ConfigError::LoadError { .. })));

        let result = load(ServiceKind::Buyer, &[("STOREFRONT_PORT", "http")]);
        assert!(matches!(result, Err(ConfigError::LoadError { .. })));
    }

    #[test]
    fn test_server_config_helpers() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            port: 8080,
            request_timeout_seconds: 45,
            max_request_size: 1024,
        };

        assert_eq!(config.request_timeout(), Duration::from_secs(45));
        assert_eq!(config.bind_address(), "localhost:8080");
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::ValidationError {
            message: "Invalid configuration".to_string(),
        };
        assert_eq!(error.to_string(), "Validation error: Invalid configuration");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_host(), "127.0.0.1");
        assert_eq!(default_timeout(), 30);
        assert_eq!(default_max_request_size(), 1024 * 1024);
        assert_eq!(default_users_table(), "StorefrontUsers");
        assert_eq!(default_inventory_table(), "StorefrontInventory");
        assert_eq!(default_orders_table(), "StorefrontOrders");
        assert_eq!(default_carts_table(), "StorefrontCarts");
        assert_eq!(default_region(), "us-east-1");
        assert_eq!(default_password_hash_rounds(), 100_000);
        assert_eq!(default_service_name(ServiceKind::Seller), "storefront-seller");
        assert_eq!(default_log_level(), "info");
    }
}
