use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{self, RandomIdGenerator, Sampler},
    Resource,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Failed to initialize OpenTelemetry: {0}")]
    OpenTelemetryInit(#[from] opentelemetry::trace::TraceError),
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Settings for [`init_observability`]
#[derive(Debug, Clone)]
pub struct TracingSettings<'a> {
    pub service_name: &'a str,
    pub service_version: &'a str,
    /// Spans are only exported when an OTLP endpoint is configured
    pub otlp_endpoint: Option<&'a str>,
    pub log_level: &'a str,
    pub enable_json_logging: bool,
}

/// Install the global subscriber: env filter, optional OTLP export, and a
/// human or JSON formatter
pub fn init_observability(settings: &TracingSettings<'_>) -> Result<(), ObservabilityError> {
    let tracer = match settings.otlp_endpoint.filter(|endpoint| !endpoint.is_empty()) {
        Some(endpoint) => Some(init_opentelemetry_tracer(
            settings.service_name,
            settings.service_version,
            endpoint,
        )?),
        None => None,
    };
    let exporting = tracer.is_some();
    let opentelemetry_layer = tracer.map(OpenTelemetryLayer::new);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "storefront_rs={level},{service}={level},tower_http=info,aws_sdk_dynamodb=warn,aws_config=warn",
            level = settings.log_level,
            service = settings.service_name.replace('-', "_"),
        )
        .into()
    });

    let result = if settings.enable_json_logging {
        // Flat JSON lines; span context travels in trace_id fields instead
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_target(false)
            .with_level(true)
            .with_span_events(FmtSpan::NONE);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(opentelemetry_layer)
            .with(fmt_layer)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(opentelemetry_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_span_events(FmtSpan::NONE),
            )
            .try_init()
    };
    result.map_err(|e| ObservabilityError::TracingInit(e.to_string()))?;

    info!(
        service = settings.service_name,
        version = settings.service_version,
        otlp_export = exporting,
        "Observability initialized"
    );
    Ok(())
}

/// Trace id of the active span, if it carries a valid OpenTelemetry context
pub fn get_current_trace_id() -> Option<String> {
    use opentelemetry::trace::TraceContextExt;
    use tracing_opentelemetry::OpenTelemetrySpanExt;

    let current_span = tracing::Span::current();
    let context = current_span.context();
    let span = context.span();
    let span_context = span.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

/// Log at info level with the current trace id attached
#[macro_export]
macro_rules! info_with_trace {
    ($($arg:tt)*) => {
        if let Some(trace_id) = $crate::observability::tracing::get_current_trace_id() {
            tracing::info!(trace_id = %trace_id, $($arg)*);
        } else {
            tracing::info!($($arg)*);
        }
    };
}

/// Log at error level with the current trace id attached
#[macro_export]
macro_rules! error_with_trace {
    ($($arg:tt)*) => {
        if let Some(trace_id) = $crate::observability::tracing::get_current_trace_id() {
            tracing::error!(trace_id = %trace_id, $($arg)*);
        } else {
            tracing::error!($($arg)*);
        }
    };
}

/// Log at warn level with the current trace id attached
#[macro_export]
macro_rules! warn_with_trace {
    ($($arg:tt)*) => {
        if let Some(trace_id) = $crate::observability::tracing::get_current_trace_id() {
            tracing::warn!(trace_id = %trace_id, $($arg)*);
        } else {
            tracing::warn!($($arg)*);
        }
    };
}

fn init_opentelemetry_tracer(
    service_name: &str,
    service_version: &str,
    otlp_endpoint: &str,
) -> Result<opentelemetry_sdk::trace::Tracer, ObservabilityError> {
    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", service_version.to_string()),
        KeyValue::new("service.namespace", "storefront"),
        KeyValue::new("telemetry.sdk.name", "opentelemetry"),
        KeyValue::new("telemetry.sdk.language", "rust"),
    ]);

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(otlp_endpoint);

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            trace::config()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_max_attributes_per_span(32)
                .with_resource(resource),
        )
        .with_batch_config(
            trace::BatchConfig::default()
                .with_max_queue_size(2048)
                .with_max_export_batch_size(512)
                .with_scheduled_delay(Duration::from_millis(500)),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    Ok(tracer)
}

/// Flush pending spans, giving up after five seconds
pub async fn shutdown_observability() {
    info!("Shutting down observability");

    // Shutdown blocks while the batch exporter drains
    let shutdown_task = tokio::task::spawn_blocking(global::shutdown_tracer_provider);

    match tokio::time::timeout(Duration::from_secs(5), shutdown_task).await {
        Ok(Ok(())) => info!("Observability shutdown completed"),
        Ok(Err(e)) => warn!("Error during observability shutdown: {}", e),
        Err(_) => warn!("Observability shutdown timed out after 5 seconds"),
    }
}
