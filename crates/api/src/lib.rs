pub mod config;
pub mod encoding;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, get_configuration};
pub use error::ApiError;
pub use routes::{PredictResponse, router};
pub use state::AppState;
