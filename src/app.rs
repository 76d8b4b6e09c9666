//! Composition root shared by the three service binaries.

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use axum::{
    http::{header, Method},
    middleware,
    routing::get,
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use tracing::{info, warn};

use crate::config::{Config, DatabaseConfig, ServerConfig, StoreBackend};
use crate::handlers::{
    auth_router, buyer_router, health_check, metrics_handler, request_size_middleware, root,
    security_headers_middleware, seller_router, AuthState, BuyerState, SellerState,
};
use crate::models::ServiceKind;
use crate::observability::{
    init_observability, observability_middleware, shutdown_observability,
    BusinessTracingMiddleware, Metrics, TracingSettings,
};
use crate::repositories::{
    CartRepository, CheckoutRepository, DynamoDbCartRepository, DynamoDbCheckoutRepository,
    DynamoDbInventoryRepository, DynamoDbOrderRepository, DynamoDbUserRepository, InMemoryStore,
    InventoryRepository, Metered, OrderRepository, StoreTables, TableManager, UserRepository,
};
use crate::services::{AuthService, BuyerService, PasswordHasher, SellerService};

/// Metrics label for the checkout unit of work, which spans several tables
const CHECKOUT_LABEL: &str = "checkout";

/// The repositories a service is built from
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub inventory: Arc<dyn InventoryRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub checkout: Arc<dyn CheckoutRepository>,
}

impl Stores {
    /// All collections over one in-process store
    pub fn in_memory(store: Arc<InMemoryStore>, tables: &StoreTables, metrics: Arc<Metrics>) -> Self {
        Self {
            users: Arc::new(Metered::new(store.clone(), &tables.users, metrics.clone())),
            inventory: Arc::new(Metered::new(store.clone(), &tables.inventory, metrics.clone())),
            carts: Arc::new(Metered::new(store.clone(), &tables.carts, metrics.clone())),
            orders: Arc::new(Metered::new(store.clone(), &tables.orders, metrics.clone())),
            checkout: Arc::new(Metered::new(store, CHECKOUT_LABEL, metrics)),
        }
    }

    /// One DynamoDB table per collection
    pub fn dynamodb(
        client: Arc<DynamoDbClient>,
        tables: &StoreTables,
        region: &str,
        metrics: Arc<Metrics>,
    ) -> Self {
        let users = DynamoDbUserRepository::new(client.clone(), tables.users.clone(), region.to_string());
        let inventory = DynamoDbInventoryRepository::new(
            client.clone(),
            tables.inventory.clone(),
            region.to_string(),
        );
        let carts = DynamoDbCartRepository::new(client.clone(), tables.carts.clone(), region.to_string());
        let orders = DynamoDbOrderRepository::new(client.clone(), tables.orders.clone(), region.to_string());
        let checkout = DynamoDbCheckoutRepository::new(client, tables.clone(), region.to_string());

        Self {
            users: Arc::new(Metered::new(Arc::new(users), &tables.users, metrics.clone())),
            inventory: Arc::new(Metered::new(Arc::new(inventory), &tables.inventory, metrics.clone())),
            carts: Arc::new(Metered::new(Arc::new(carts), &tables.carts, metrics.clone())),
            orders: Arc::new(Metered::new(Arc::new(orders), &tables.orders, metrics.clone())),
            checkout: Arc::new(Metered::new(Arc::new(checkout), CHECKOUT_LABEL, metrics)),
        }
    }
}

/// Build the DynamoDB client, honouring a local endpoint override
pub async fn dynamodb_client(database: &DatabaseConfig) -> DynamoDbClient {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(database.region.clone()))
        .load()
        .await;

    match &database.endpoint_url {
        Some(endpoint_url) => {
            info!("Using DynamoDB endpoint {}", endpoint_url);
            let config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint_url)
                .build();
            DynamoDbClient::from_conf(config)
        }
        None => DynamoDbClient::new(&sdk_config),
    }
}

/// Service-specific routes for one binary
pub fn service_router(
    kind: ServiceKind,
    stores: &Stores,
    hasher: PasswordHasher,
    metrics: Arc<Metrics>,
) -> Router {
    let tracer = Arc::new(BusinessTracingMiddleware::new(metrics));

    match kind {
        ServiceKind::Auth => auth_router(AuthState {
            auth_service: Arc::new(AuthService::new(stores.users.clone(), hasher)),
            tracer,
        }),
        ServiceKind::Buyer => buyer_router(BuyerState {
            buyer_service: Arc::new(BuyerService::new(
                stores.users.clone(),
                stores.inventory.clone(),
                stores.carts.clone(),
                stores.orders.clone(),
                stores.checkout.clone(),
            )),
            tracer,
        }),
        ServiceKind::Seller => seller_router(SellerState {
            seller_service: Arc::new(SellerService::new(stores.inventory.clone())),
            tracer,
        }),
    }
}

/// Full application: service routes, shared routes and middleware stack
pub fn create_app(
    kind: ServiceKind,
    stores: &Stores,
    hasher: PasswordHasher,
    metrics: Arc<Metrics>,
    server: &ServerConfig,
) -> Router {
    let metrics_for_middleware = metrics.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(86400));

    let shared = Router::new()
        .route("/", get(root))
        .route("/health/status", get(health_check))
        .with_state(kind)
        .route("/metrics", get(metrics_handler))
        .with_state(metrics.clone());

    Router::new()
        .merge(shared)
        .merge(service_router(kind, stores, hasher, metrics))
        // Outer to inner: observability, timeout, size guard, CORS, headers
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            server.max_request_size,
            request_size_middleware,
        ))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}

/// Build the repositories for the configured backend
pub async fn build_stores(
    config: &Config,
    metrics: Arc<Metrics>,
) -> Result<Stores, Box<dyn std::error::Error>> {
    let tables = config.database.tables();

    match config.database.store_backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on exit and not shared between services");
            Ok(Stores::in_memory(Arc::new(InMemoryStore::new()), &tables, metrics))
        }
        StoreBackend::DynamoDb => {
            let client = Arc::new(dynamodb_client(&config.database).await);

            if config.database.auto_create_tables {
                TableManager::new(client.clone())
                    .create_all_tables(&tables)
                    .await?;
            }

            Ok(Stores::dynamodb(client, &tables, &config.database.region, metrics))
        }
    }
}

/// Load configuration, wire the service and serve until CTRL+C
pub async fn run(kind: ServiceKind) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_environment(kind)?;

    init_observability(&TracingSettings {
        service_name: &config.observability.service_name,
        service_version: &config.observability.service_version,
        otlp_endpoint: config.observability.otlp_endpoint.as_deref(),
        log_level: &config.observability.log_level,
        enable_json_logging: config.observability.enable_json_logging,
    })?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!(
        backend = ?config.database.store_backend,
        region = %config.database.region,
        "Tables: users={}, inventory={}, orders={}, carts={}",
        config.database.users_table_name,
        config.database.inventory_table_name,
        config.database.orders_table_name,
        config.database.carts_table_name
    );

    let metrics = Arc::new(Metrics::new()?);
    let stores = build_stores(&config, metrics.clone()).await?;
    let hasher = PasswordHasher::new(config.security.password_hash_rounds);

    let app = create_app(kind, &stores, hasher, metrics, &config.server);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = TcpListener::bind(addr).await?;
    info!("{} service listening on {}", kind, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_observability().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for CTRL+C, shutting down: {}", e),
    }
}
