use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::error;

use crate::models::{ErrorKind, ServiceError};

/// Error returned by every storefront handler. Renders as
/// `{"error", "code", "timestamp"}` with the status for its kind.
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// Query string could not be parsed into the request type
    MalformedQuery(String),
    /// Registry could not be rendered for a scrape
    MetricsUnavailable(String),
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Conflict | ErrorKind::InsufficientStock => StatusCode::CONFLICT,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Service(err) => err.kind(),
            ApiError::MalformedQuery(_) => ErrorKind::InvalidArgument,
            ApiError::MetricsUnavailable(_) => ErrorKind::Internal,
        }
    }

    /// Client-facing message. Store failures are not described in detail.
    fn message(&self) -> String {
        match self {
            ApiError::MalformedQuery(detail) => format!("Invalid query parameters: {}", detail),
            ApiError::MetricsUnavailable(_) => "Metrics are unavailable".to_string(),
            ApiError::Service(err) => match err.kind() {
                ErrorKind::Internal => "Internal server error".to_string(),
                ErrorKind::Unavailable => "Service temporarily unavailable".to_string(),
                ErrorKind::Timeout => "Store request timed out".to_string(),
                _ => err.to_string(),
            },
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);

        if status.is_server_error() {
            error!(error = ?self, "Request failed");
        }

        (
            status,
            Json(json!({
                "error": self.message(),
                "code": kind.code(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
            .into_response()
    }
}

/// `Query` extractor whose rejection uses the storefront error body
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|rejection| ApiError::MalformedQuery(rejection.body_text()))
    }
}
