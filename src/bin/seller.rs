#![recursion_limit = "256"]

use storefront_rs::{app, models::ServiceKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    app::run(ServiceKind::Seller).await
}
