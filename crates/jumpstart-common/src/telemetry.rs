use std::collections::HashMap;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where diagnostics go for one CLI invocation.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// `service.name` attached to exported spans.
    pub service_name: String,
    /// OTLP/HTTP base URL; the exporter appends `/v1/traces`.
    pub otlp_endpoint: Option<String>,
    /// Sent as `Authorization: Bearer` to the collector.
    pub otlp_token: Option<String>,
}

/// Flushes exported spans when dropped. Hold it until `main` returns.
#[must_use]
pub struct TelemetryGuard {
    provider: Option<TracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("failed to flush traces: {err}");
            }
        }
    }
}

/// Install the global subscriber.
///
/// Log lines always go to stderr so `list --json` output on stdout stays
/// parseable. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing(config: &TelemetryConfig) -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let Some(endpoint) = config.otlp_endpoint.as_deref() else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
        return TelemetryGuard { provider: None };
    };

    let mut headers = HashMap::new();
    if let Some(token) = config.otlp_token.as_deref().filter(|t| !t.is_empty()) {
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    }

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_headers(headers)
        .build()
    {
        Ok(e) => e,
        Err(err) => {
            eprintln!("failed to create OTLP exporter: {err}, logging to stderr only");
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
            return TelemetryGuard { provider: None };
        }
    };

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new(
            "service.name",
            config.service_name.clone(),
        )]))
        .build();

    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(config.service_name.clone()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    tracing::debug!(endpoint, service_name = %config.service_name, "OTLP tracing enabled");
    TelemetryGuard {
        provider: Some(provider),
    }
}
