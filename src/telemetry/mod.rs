//! # Observability
//! Helpers that make both services observable as one connected trace.
//!
//! ## Setup
//! [`init`] installs the `tracing` subscriber, the OpenTelemetry tracer and
//! logger providers (OTLP over HTTP) and the W3C trace-context propagator. It
//! should be the first call of any server binary. The returned [`Telemetry`]
//! guard flushes pending spans and logs when dropped.
//!
//! ## Http Trace Propagation
//! [`propagation`] injects and extracts the trace context into/from
//! [`http::HeaderMap`]s. [`layer::ServerSpanLayer`] does the extraction for
//! inbound axum routes and [`client::TracePropagation`] does the injection for
//! outbound `reqwest` calls.
//!
//! Export happens on the SDK's batch workers, so a collector that is down
//! only costs dropped telemetry, never a failed request.

pub mod client;
pub mod layer;
pub mod propagation;

use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource, logs::SdkLoggerProvider, propagation::TraceContextPropagator,
    trace::SdkTracerProvider,
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::TelemetryConfig;

pub use client::{TracePropagation, build_http_client};
pub use layer::ServerSpanLayer;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Keeps the OpenTelemetry providers alive and shuts them down on drop.
#[must_use = "dropping the guard shuts down span and log export"]
pub struct Telemetry {
    tracer_provider: Option<SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl Telemetry {
    /// A guard with nothing to flush, used when export is disabled
    fn local_only() -> Self {
        Self {
            tracer_provider: None,
            logger_provider: None,
        }
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(err) = provider.shutdown() {
                tracing::warn!(error = %err, "Failed to flush spans on shutdown");
            }
        }
        if let Some(provider) = self.logger_provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("failed to flush logs on shutdown: {err}");
            }
        }
    }
}

/// Sets up logging, tracing and OTLP export for one service.
///
/// `RUST_LOG` wins over `config.log_level`. With `config.enabled == false`
/// only the stdout formatter is installed.
pub fn init(config: &TelemetryConfig) -> Result<Telemetry> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log filter")?;
    let fmt_layer = tracing_subscriber::fmt::layer();

    if !config.enabled {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        tracing::info!(service = %config.service_name, "Telemetry export disabled");
        return Ok(Telemetry::local_only());
    }

    let resource = service_resource(&config.service_name);
    let tracer_provider = init_tracer_provider(&config.otlp_endpoint, resource.clone())?;
    let logger_provider = init_logger_provider(&config.otlp_endpoint, resource)?;
    global::set_tracer_provider(tracer_provider.clone());

    let tracer = tracer_provider.tracer(config.service_name.clone());
    let trace_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    let log_layer =
        OpenTelemetryTracingBridge::new(&logger_provider).with_filter(exporter_noise_filter()?);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(trace_layer)
        .with(log_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        service = %config.service_name,
        endpoint = %config.otlp_endpoint,
        "Telemetry initialized"
    );

    Ok(Telemetry {
        tracer_provider: Some(tracer_provider),
        logger_provider: Some(logger_provider),
    })
}

/// Flag the current span as failed. Only spans that declared
/// `otel.status_code` and `otel.status_message` as empty fields keep the values.
pub fn record_failure(reason: &str) {
    let span = tracing::Span::current();
    span.record("otel.status_code", "ERROR");
    span.record("otel.status_message", reason);
}

fn service_resource(service_name: &str) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, service_name.to_string()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ])
        .build()
}

fn init_tracer_provider(endpoint: &str, resource: Resource) -> Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(signal_url(endpoint, "traces"))
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to build OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

fn init_logger_provider(endpoint: &str, resource: Resource) -> Result<SdkLoggerProvider> {
    let exporter = LogExporter::builder()
        .with_http()
        .with_endpoint(signal_url(endpoint, "logs"))
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to build OTLP log exporter")?;

    Ok(SdkLoggerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}

// The exporter's own HTTP stack logs through `tracing`; shipping those events
// back through the exporter would loop.
fn exporter_noise_filter() -> Result<EnvFilter> {
    let mut filter = EnvFilter::new("info");
    for directive in ["hyper=off", "h2=off", "reqwest=off", "opentelemetry=off"] {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Full OTLP/HTTP URL for one signal, e.g. `http://collector:4318/v1/traces`
fn signal_url(endpoint: &str, signal: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    let suffix = format!("/v1/{signal}");
    if base.ends_with(&suffix) {
        base.to_string()
    } else {
        format!("{base}{suffix}")
    }
}
