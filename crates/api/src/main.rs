use anyhow::Context;
use api::{AppState, get_configuration, router};
use inference::{Detector, InferenceBackend, InferenceConfig, OrtBackend};
use tokio::signal::unix::{SignalKind, signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("Failed to load configuration")?;
    let _telemetry = common::init_observability("api", config.environment())?;

    let inference_config = InferenceConfig::from_env()?;
    tracing::info!(
        model = %inference_config.model_path,
        provider = ?inference_config.execution_provider,
        "Loading model"
    );

    let backend = OrtBackend::load_model(&inference_config)?;
    let detector = Detector::new(backend, &inference_config);
    tracing::info!(
        classes = detector.labels().len(),
        input_size = ?detector.input_size(),
        "Model loaded"
    );

    let app = router(AppState::new(detector), &config)?;

    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(%address, cors_origin = %config.cors_origin, "Inference service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Inference service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
    tracing::info!("Shutdown signal received");
}
