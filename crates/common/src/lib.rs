pub mod config;
pub mod logging;
pub mod telemetry;
pub mod wait;

pub use config::Environment;
pub use logging::{init_observability, setup_logging};
pub use telemetry::TelemetryGuard;
pub use wait::{WaitOptions, wait_for_resource};
