use std::env;

pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// OTLP collector endpoint. Telemetry export is off when unset.
pub const OTEL_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Unknown values fall back to development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn from_env() -> Self {
        env::var(ENVIRONMENT_VAR)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// Reads the OTLP endpoint, treating an empty value as unset.
pub fn otel_endpoint_from_env() -> Option<String> {
    env::var(OTEL_ENDPOINT_VAR)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
