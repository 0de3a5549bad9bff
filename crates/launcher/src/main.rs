use launcher::{LauncherConfig, Outcome, Supervisor};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

fn main() -> anyhow::Result<()> {
    let config = LauncherConfig::from_env()?;
    common::setup_logging(config.environment);
    let shutdown = Arc::new(AtomicBool::new(false));

    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    tracing::info!("Signal handlers registered (SIGTERM, SIGINT)");
    tracing::info!(
        api = %config.api.program,
        api_address = %config.api_address,
        frontend = %config.frontend.program,
        "Starting services"
    );

    match Supervisor::new(config, shutdown).run() {
        Ok(Outcome::Interrupted) => {
            tracing::info!("Launcher stopped gracefully");
            Ok(())
        }
        Ok(Outcome::ChildrenExited) => {
            tracing::info!("All services exited, launcher done");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Launcher failed: {:#}", e);
            Err(e)
        }
    }
}
