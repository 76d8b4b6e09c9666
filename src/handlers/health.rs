use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use tracing::instrument;

use crate::models::{MessageResponse, ServiceKind};

/// Health check endpoint handler
#[instrument(name = "health_check")]
pub async fn health_check(State(kind): State<ServiceKind>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": format!("storefront-{}", kind),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Root banner naming the running service
pub async fn root(State(kind): State<ServiceKind>) -> Json<MessageResponse> {
    Json(MessageResponse::new(kind.banner()))
}
