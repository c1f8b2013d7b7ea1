//! Log output for the studyquiz binary
//!
//! `RUST_LOG` always wins; otherwise `--debug` picks between a quiet and a
//! verbose default. Built with the `telemetry` feature, `--otel` adds an OTLP
//! span exporter configured through `OTEL_EXPORTER_OTLP_ENDPOINT` and
//! `OTEL_SERVICE_NAME`.

use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConfig {
    pub debug: bool,
    pub otel: bool,
}

impl TracingConfig {
    fn default_directives(&self) -> &'static str {
        if self.debug {
            "debug,hyper=info,h2=info"
        } else {
            "info,sqlx=warn,tower_http=info"
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directives()))
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init(config: &TracingConfig) -> Result<()> {
    #[cfg(feature = "telemetry")]
    let export = if config.otel {
        Some(otlp::layer()?)
    } else {
        None
    };

    #[cfg(not(feature = "telemetry"))]
    let export: Option<tracing_subscriber::layer::Identity> = {
        if config.otel {
            eprintln!("--otel ignored: built without the `telemetry` feature");
        }
        None
    };

    let exporting = export.is_some();
    let console = tracing_subscriber::fmt::layer()
        .with_target(config.debug)
        .compact();

    tracing_subscriber::registry()
        .with(config.filter())
        .with(console)
        .with(export)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    if exporting {
        tracing::info!("exporting spans over OTLP");
    }
    Ok(())
}

/// Flush spans still queued for export.
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(feature = "telemetry")]
mod otlp {
    use anyhow::{Context, Result};
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::{Tracer, TracerProvider};
    use opentelemetry_sdk::{runtime, Resource};
    use tracing::Subscriber;
    use tracing_opentelemetry::OpenTelemetryLayer;
    use tracing_subscriber::registry::LookupSpan;

    fn env_or(key: &str, default: &str) -> String {
        std::env::var(key).unwrap_or_else(|_| default.to_owned())
    }

    pub fn layer<S>() -> Result<OpenTelemetryLayer<S, Tracer>>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let endpoint = env_or("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317");
        let service = env_or("OTEL_SERVICE_NAME", "studyquiz");

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.as_str())
            .build()
            .with_context(|| format!("OTLP exporter for {}", endpoint))?;

        let provider = TracerProvider::builder()
            .with_batch_exporter(exporter, runtime::Tokio)
            .with_resource(Resource::new([KeyValue::new("service.name", service)]))
            .build();
        let tracer = provider.tracer("studyquiz");

        // the global handle keeps the batch exporter alive until shutdown
        opentelemetry::global::set_tracer_provider(provider);
        Ok(tracing_opentelemetry::layer().with_tracer(tracer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_default_mutes_sql_chatter() {
        let quiet = TracingConfig::default();
        assert!(quiet.default_directives().contains("sqlx=warn"));

        let verbose = TracingConfig { debug: true, otel: false };
        assert!(verbose.default_directives().starts_with("debug"));
    }
}
