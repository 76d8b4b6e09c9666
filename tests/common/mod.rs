#![allow(dead_code)]

use std::sync::Arc;

use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::net::TcpListener;

use storefront_rs::app::{create_app, Stores};
use storefront_rs::config::ServerConfig;
use storefront_rs::models::ServiceKind;
use storefront_rs::observability::Metrics;
use storefront_rs::repositories::{InMemoryStore, StoreTables};
use storefront_rs::services::PasswordHasher;

/// The three services served on ephemeral ports over one shared store
pub struct TestEnvironment {
    pub client: Client,
    pub auth_url: String,
    pub buyer_url: String,
    pub seller_url: String,
    pub store: Arc<InMemoryStore>,
}

fn tables() -> StoreTables {
    StoreTables {
        users: "StorefrontUsers".to_string(),
        inventory: "StorefrontInventory".to_string(),
        orders: "StorefrontOrders".to_string(),
        carts: "StorefrontCarts".to_string(),
    }
}

async fn serve(kind: ServiceKind, store: Arc<InMemoryStore>) -> String {
    let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
    let stores = Stores::in_memory(store, &tables(), metrics.clone());
    let server = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_seconds: 30,
        max_request_size: 1024 * 1024,
    };
    // Low round count keeps the suite fast; the format is the same
    let app = create_app(kind, &stores, PasswordHasher::new(1_000), metrics, &server);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local address");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Failed to serve app");
    });

    format!("http://{}", addr)
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());

        Self {
            client: Client::new(),
            auth_url: serve(ServiceKind::Auth, store.clone()).await,
            buyer_url: serve(ServiceKind::Buyer, store.clone()).await,
            seller_url: serve(ServiceKind::Seller, store.clone()).await,
            store,
        }
    }

    pub async fn get(&self, base: &str, path: &str, query: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}{}", base, path))
            .query(query)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn post(&self, base: &str, path: &str, query: &[(&str, &str)]) -> Response {
        self.client
            .post(format!("{}{}", base, path))
            .query(query)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn delete(&self, base: &str, path: &str, query: &[(&str, &str)]) -> Response {
        self.client
            .delete(format!("{}{}", base, path))
            .query(query)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn register(&self, username: &str, role: &str) {
        let response = self
            .post(
                &self.auth_url,
                "/register_user",
                &[("username", username), ("password", "secret"), ("role", role)],
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);
    }

    /// Seller "alice" listing "Pen" at 10 with 5 in stock; returns its product id
    pub async fn seed_pen(&self) -> String {
        self.register("alice", "seller").await;
        let response = self
            .post(
                &self.seller_url,
                "/add_item",
                &[
                    ("username", "alice"),
                    ("product", "Pen"),
                    ("price", "10"),
                    ("quantity", "5"),
                    ("image_url", "http://x/img.png"),
                ],
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);
        let body = json(response).await;
        body["product_id"].as_str().expect("product_id").to_string()
    }

    pub async fn add_balance(&self, buyer: &str, amount: &str) -> Response {
        self.post(
            &self.buyer_url,
            "/add_balance",
            &[("buyer", buyer), ("amount", amount)],
        )
        .await
    }

    pub async fn add_to_cart(&self, buyer: &str, product_id: &str, quantity: &str) -> Response {
        self.post(
            &self.buyer_url,
            "/add_to_cart",
            &[("buyer", buyer), ("product_id", product_id), ("quantity", quantity)],
        )
        .await
    }

    pub async fn place_order(&self, buyer: &str) -> Response {
        self.post(&self.buyer_url, "/place_order", &[("buyer", buyer)])
            .await
    }

    pub async fn balance(&self, buyer: &str) -> Decimal {
        let body = json(self.get(&self.buyer_url, "/check_balance", &[("buyer", buyer)]).await).await;
        decimal(&body["balance"])
    }

    pub async fn stock(&self, product_id: &str) -> u64 {
        let products = json(self.get(&self.buyer_url, "/view_products", &[]).await).await;
        products
            .as_array()
            .expect("product list")
            .iter()
            .find(|product| product["product_id"] == product_id)
            .and_then(|product| product["quantity"].as_u64())
            .expect("product listed")
    }

    pub async fn cart_len(&self, buyer: &str) -> usize {
        let cart = json(self.get(&self.buyer_url, "/view_cart", &[("buyer", buyer)]).await).await;
        cart.as_array().expect("cart list").len()
    }
}

pub async fn json(response: Response) -> Value {
    response.json().await.expect("Failed to parse response")
}

/// Decimals travel as JSON strings
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal string")
        .parse()
        .expect("valid decimal")
}
