use common::Environment;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// The single origin allowed to call the API with credentials.
    pub cors_origin: String,
    pub body_limit_bytes: usize,
    pub environment: String,
}

impl ApiConfig {
    pub fn environment(&self) -> Environment {
        Environment::parse(&self.environment)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Defaults overridden by `API_*` variables, e.g. `API_PORT=9000`.
///
/// `API_ENVIRONMENT` falls back to the workspace-wide `ENVIRONMENT`.
pub fn get_configuration() -> Result<ApiConfig, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("host", "127.0.0.1")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("cors_origin", DEFAULT_CORS_ORIGIN)?
        .set_default("body_limit_bytes", DEFAULT_BODY_LIMIT_BYTES as i64)?
        .set_default("environment", Environment::from_env().as_str())?
        .add_source(
            config::Environment::with_prefix("API")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize::<ApiConfig>()
}
