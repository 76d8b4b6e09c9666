use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use prometheus::TEXT_FORMAT;
use std::sync::Arc;
use tracing::instrument;

use super::ApiError;
use crate::observability::Metrics;

/// Prometheus scrape endpoint, one registry per storefront service
#[instrument(name = "metrics_handler", skip(metrics))]
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Result<Response, ApiError> {
    let body = metrics
        .encode()
        .map_err(|e| ApiError::MetricsUnavailable(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, TEXT_FORMAT),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
        .into_response())
}
