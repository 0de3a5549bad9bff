use crate::{
    config::ApiConfig,
    encoding::{decode_image, encode_base64_jpeg},
    error::ApiError,
    state::AppState,
};
use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::HeaderValue,
    routing::{get, post},
};
use inference::{Detection, InferenceBackend, InferenceResult};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Instant;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};

/// Form field the frontend uploads the picture under.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub detections: Vec<Detection>,
    /// Annotated frame, base64 JPEG.
    pub image: String,
}

pub fn router<B>(state: AppState<B>, config: &ApiConfig) -> anyhow::Result<Router>
where
    B: InferenceBackend + Send + 'static,
{
    let origin = HeaderValue::from_str(&config.cors_origin)
        .with_context(|| format!("Invalid CORS origin: {}", config.cors_origin))?;

    // Wildcards are not allowed together with credentials, so methods and
    // headers echo whatever the preflight asks for.
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let app = Router::new()
        .route("/predict", post(predict::<B>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn predict<B>(
    State(state): State<AppState<B>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError>
where
    B: InferenceBackend + Send + 'static,
{
    let mut multipart = multipart?;
    let upload = read_image_field(&mut multipart).await?;
    tracing::debug!(bytes = upload.len(), "Image received");

    let start = Instant::now();
    let detector = state.detector.clone();

    let response = tokio::task::spawn_blocking(move || -> anyhow::Result<PredictResponse> {
        let image = decode_image(&upload)?;

        let InferenceResult {
            detections,
            annotated,
        } = {
            let mut detector = detector
                .lock()
                .map_err(|_| anyhow::anyhow!("Detector unavailable after an earlier panic"))?;
            detector.predict(&image)?
        };

        let image = encode_base64_jpeg(&annotated)?;
        Ok(PredictResponse { detections, image })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Inference task failed: {}", e)))?
    .map_err(|e| ApiError::Internal(format!("{:#}", e)))?;

    let elapsed = start.elapsed().as_secs_f64();
    state.metrics.record(elapsed, response.detections.len());
    tracing::info!(
        detections = response.detections.len(),
        elapsed_ms = elapsed * 1000.0,
        "Prediction served"
    );

    Ok(Json(response))
}

/// Returns the bytes of the uploaded file: the `image` field, or failing that
/// the first field that carries a file name.
#[tracing::instrument(skip_all)]
async fn read_image_field(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        let is_file = field.name() == Some(IMAGE_FIELD) || field.file_name().is_some();
        if !is_file {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|content_type| content_type.starts_with("image/"));
        if !is_image {
            return Err(ApiError::InvalidInput("File must be an image".to_string()));
        }

        return Ok(field.bytes().await?);
    }

    Err(ApiError::InvalidInput("No image file provided".to_string()))
}
