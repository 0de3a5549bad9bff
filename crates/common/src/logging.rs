use crate::config::{Environment, otel_endpoint_from_env};
use crate::telemetry::TelemetryGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber with pretty formatting for development
/// and JSON formatting for production.
///
/// Uses RUST_LOG environment variable for filtering (defaults to "info" if not set).
///
/// The OpenTelemetry layer is a no-op unless a global tracer provider
/// has been installed.
pub fn setup_logging(environment: Environment) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let otel_layer = tracing_opentelemetry::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer);

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .init();
        }
    }
}

/// Set up logging for a binary, exporting to OTLP when an endpoint is configured.
///
/// The returned guard must be kept alive for the lifetime of the process.
/// Telemetry export needs a Tokio runtime, so synchronous binaries should
/// call this from inside one or stick to [`setup_logging`].
pub fn init_observability(
    service_name: &str,
    environment: Environment,
) -> anyhow::Result<Option<TelemetryGuard>> {
    match otel_endpoint_from_env() {
        Some(endpoint) => {
            let guard = TelemetryGuard::init(service_name, &endpoint, environment)?;
            tracing::info!(%endpoint, service_name, "OpenTelemetry export enabled");
            Ok(Some(guard))
        }
        None => {
            setup_logging(environment);
            Ok(None)
        }
    }
}
