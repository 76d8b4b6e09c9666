use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::warn;

use crate::models::ErrorKind;

/// Reject requests whose declared body exceeds `max_request_size` bytes
pub async fn request_size_middleware(
    State(max_request_size): State<usize>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(length) = content_length(&request) {
        if length > max_request_size {
            warn!("Request too large: {} bytes", length);
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({
                    "error": format!(
                        "Request size {} bytes exceeds maximum of {} bytes",
                        length, max_request_size
                    ),
                    "code": ErrorKind::InvalidArgument.code(),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            )
                .into_response();
        }
    }

    next.run(request).await
}

fn content_length(request: &Request<Body>) -> Option<usize> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'"),
    );

    response
}
