use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::{sync::Arc, time::Instant};
use tracing::{error, info, instrument, warn, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{get_current_trace_id, Metrics};
use crate::models::ServiceResult;

fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers().get(name).and_then(|value| value.to_str().ok())
}

/// First hop of X-Forwarded-For, then X-Real-IP
fn client_ip(request: &Request) -> String {
    header(request, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .or_else(|| header(request, "x-real-ip"))
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

/// Per-request span, in-flight gauge, latency histogram and completion log
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let user_agent = header(&request, "user-agent").unwrap_or("unknown").to_string();
    let client_ip = client_ip(&request);

    // Group by route template so query strings do not explode label cardinality
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let span_name = format!("{} {}", method, endpoint);
    let span = tracing::info_span!(
        target: "storefront_rs::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %endpoint,
        http.url = %uri,
        http.user_agent = %user_agent,
        client.address = %client_ip,
        http.response.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async {
        metrics.increment_in_flight(&method, &endpoint);
        let trace_id = get_current_trace_id().unwrap_or_default();

        info!(trace_id = %trace_id, method = %method, path = %endpoint, client_ip = %client_ip, "Processing request");

        let response = next.run(request).await;

        let duration = start_time.elapsed();
        let duration_ms = duration.as_millis();
        let status_code = response.status().as_u16();

        let current_span = tracing::Span::current();
        current_span.record("http.response.status_code", status_code);
        current_span.record("http.response_time_ms", duration_ms);

        let otel_context = current_span.context();
        let otel_span = otel_context.span();
        if status_code >= 500 {
            otel_span.set_status(opentelemetry::trace::Status::error("HTTP server error"));
        } else {
            otel_span.set_status(opentelemetry::trace::Status::Ok);
        }

        metrics.record_http_request(&method, &endpoint, status_code, duration.as_secs_f64());
        metrics.decrement_in_flight(&method, &endpoint);

        // 4xx are business outcomes, not service faults
        if status_code >= 500 {
            error!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request failed"
            );
        } else if status_code >= 400 {
            warn!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request rejected"
            );
        } else {
            info!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request completed"
            );
        }

        response
    }
    .instrument(span)
    .await
}

/// Middleware specifically for database operation tracing
pub struct DatabaseTracingMiddleware {
    metrics: Arc<Metrics>,
}

impl DatabaseTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    /// Trace a database operation with automatic metrics recording
    #[instrument(skip_all, fields(
        operation = %operation,
        table = %table,
    ))]
    pub async fn trace_operation<F, T, E>(
        &self,
        operation: &str,
        table: &str,
        future: F,
    ) -> Result<T, E>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();

        info!("Starting database operation");

        match future.await {
            Ok(result) => {
                let duration_seconds = start_time.elapsed().as_secs_f64();
                self.metrics
                    .record_database_operation(operation, table, true, duration_seconds);

                info!(
                    duration_ms = start_time.elapsed().as_millis(),
                    "Database operation completed successfully"
                );

                Ok(result)
            }
            Err(error) => {
                let duration_seconds = start_time.elapsed().as_secs_f64();
                self.metrics
                    .record_database_operation(operation, table, false, duration_seconds);

                error!(
                    error = %error,
                    duration_ms = start_time.elapsed().as_millis(),
                    "Database operation failed"
                );

                Err(error)
            }
        }
    }
}

/// Middleware for storefront operation tracing
pub struct BusinessTracingMiddleware {
    metrics: Arc<Metrics>,
}

impl BusinessTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    /// Trace a service operation, labelling failures with their error code
    #[instrument(skip_all, fields(
        service = %service,
        operation = %operation,
    ))]
    pub async fn trace_operation<F, T>(
        &self,
        service: &str,
        operation: &str,
        future: F,
    ) -> ServiceResult<T>
    where
        F: std::future::Future<Output = ServiceResult<T>>,
    {
        let start_time = Instant::now();

        info!("Starting {} operation", operation);

        match future.await {
            Ok(result) => {
                self.metrics
                    .record_business_operation(service, operation, "success");

                info!(
                    duration_ms = start_time.elapsed().as_millis(),
                    "Operation completed successfully"
                );

                Ok(result)
            }
            Err(error) => {
                let code = error.kind().code();
                self.metrics.record_business_operation(service, operation, code);

                warn!(
                    error = %error,
                    code = code,
                    duration_ms = start_time.elapsed().as_millis(),
                    "Operation failed"
                );

                Err(error)
            }
        }
    }

    /// Trace a checkout, additionally counting it by outcome
    pub async fn trace_checkout<F, T>(&self, service: &str, future: F) -> ServiceResult<T>
    where
        F: std::future::Future<Output = ServiceResult<T>>,
    {
        let result = self.trace_operation(service, "place_order", future).await;
        match &result {
            Ok(_) => self.metrics.record_checkout("placed"),
            Err(error) => self.metrics.record_checkout(error.kind().code()),
        }
        result
    }
}
