//! Logging and distributed tracing configuration.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use prefixgate_core::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,prefixgate=debug";
const SERVICE_NAME: &str = "prefixgate";

/// Install the global subscriber: `RUST_LOG` filter, stdout logs (JSON when
/// `json_logs`), and an OTLP exporter when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
pub fn configure_tracing(json_logs: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.into()),
    );

    // Exactly one of these is Some.
    let json_layer = json_logs.then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!json_logs).then(|| tracing_subscriber::fmt::layer());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer);

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        let provider = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint.clone()),
            )
            .with_trace_config(
                sdktrace::Config::default()
                    .with_resource(Resource::new(vec![KeyValue::new("service.name", SERVICE_NAME)])),
            )
            .install_batch(runtime::Tokio)
            .map_err(|e| Error::telemetry(format!("Failed to install OTLP pipeline: {}", e)))?;

        let tracer = provider.tracer(SERVICE_NAME);
        opentelemetry::global::set_tracer_provider(provider);

        registry
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()
            .map_err(|e| Error::telemetry(e.to_string()))?;
        tracing::info!(endpoint = %endpoint, "OpenTelemetry tracing initialized");
    } else {
        registry.try_init().map_err(|e| Error::telemetry(e.to_string()))?;
    }

    Ok(())
}
