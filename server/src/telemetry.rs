//! Logging, tracing export, and per-request database query counting.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::{SdkTracerProvider, Tracer};
use std::env;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use std::time::Duration;
use tracing::{span::Id, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

const DEFAULT_SERVICE_NAME: &str = "foodgram-server";

/// Header carrying the number of `db.query` spans opened while serving a request.
pub const DB_QUERY_COUNT_HEADER: &str = "X-DB-Query-Count";

tokio::task_local! {
    /// Counter for database queries in the current request.
    static DB_QUERY_COUNTER: Arc<AtomicU32>;
}

/// Install the global subscriber: env filter, console output, the query
/// counter, and OTLP export of traces and logs when a collector is reachable
/// at OTEL_EXPORTER_OTLP_ENDPOINT.
pub fn init_telemetry() {
    let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();
    let service_name =
        env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

    let exporters = match endpoint.as_deref() {
        Some(endpoint) if collector_reachable(endpoint) => {
            match build_exporters(endpoint, &service_name) {
                Ok(exporters) => Some(exporters),
                Err(e) => {
                    eprintln!("Failed to set up OpenTelemetry export: {}", e);
                    None
                }
            }
        }
        _ => None,
    };

    let (tracer, log_provider) = match exporters {
        Some((tracer, log_provider)) => (Some(tracer), Some(log_provider)),
        None => (None, None),
    };
    let otel_trace_layer = tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t));
    let otel_log_layer = log_provider.as_ref().map(OpenTelemetryTracingBridge::new);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(DbQueryCountingLayer)
        .with(otel_trace_layer)
        .with(otel_log_layer)
        .init();

    match (endpoint, log_provider.is_some()) {
        (Some(endpoint), true) => tracing::info!(
            "OpenTelemetry enabled, exporting traces and logs to {} as {}",
            endpoint,
            service_name
        ),
        (Some(endpoint), false) => tracing::info!(
            "OpenTelemetry endpoint {} not reachable, using console logging only",
            endpoint
        ),
        (None, _) => {
            tracing::debug!("OTEL_EXPORTER_OTLP_ENDPOINT not set, using console logging only")
        }
    }
}

/// Quick TCP check so a missing collector doesn't stall every export.
fn collector_reachable(endpoint: &str) -> bool {
    let host_port = endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/');

    host_port
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(100)).is_ok())
        .unwrap_or(false)
}

fn build_exporters(
    endpoint: &str,
    service_name: &str,
) -> anyhow::Result<(Tracer, SdkLoggerProvider)> {
    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let trace_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .with_resource(resource.clone())
        .build();
    let tracer = trace_provider.tracer(DEFAULT_SERVICE_NAME);
    opentelemetry::global::set_tracer_provider(trace_provider);

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let log_provider = SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();

    Ok((tracer, log_provider))
}

/// The query count of the current request, if one is being tracked.
pub fn get_query_count() -> Option<u32> {
    DB_QUERY_COUNTER
        .try_with(|counter| counter.load(Ordering::Relaxed))
        .ok()
}

/// Counts `db.query` spans against the task-local counter of the current request.
///
/// Diesel calls run synchronously inside the handler's task, so the
/// task-local set up by [`query_counting_middleware`] is visible here.
pub struct DbQueryCountingLayer;

impl<S> Layer<S> for DbQueryCountingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, _attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        if span.name() == "db.query" {
            let _ = DB_QUERY_COUNTER.try_with(|counter| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }
    }
}

/// Open a `db.query` span around one storage operation.
pub fn db_query<T>(op: &'static str, f: impl FnOnce() -> T) -> T {
    let _span = tracing::debug_span!("db.query", op).entered();
    f()
}

/// Initializes the per-request query counter. Must wrap the TraceLayer.
pub async fn query_counting_middleware(request: Request<Body>, next: Next) -> Response {
    let counter = Arc::new(AtomicU32::new(0));
    DB_QUERY_COUNTER.scope(counter, next.run(request)).await
}

/// Adds the query count header when tracking is enabled in the config.
pub async fn db_query_count_header_middleware(
    State(enabled): State<bool>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    if enabled {
        if let Some(count) = get_query_count() {
            if let Ok(value) = HeaderValue::from_str(&count.to_string()) {
                response.headers_mut().insert(DB_QUERY_COUNT_HEADER, value);
            }
        }
    }

    response
}
