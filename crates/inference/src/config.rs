use std::env;
use std::str::FromStr;

/// Input size used when neither the environment nor the model metadata provide one.
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

/// Largest accepted model input side, in pixels.
pub const MAX_INPUT_SIDE: u32 = 8192;

/// Checks a (width, height) model input size is usable.
pub fn validate_input_size((width, height): (u32, u32)) -> anyhow::Result<(u32, u32)> {
    let valid = |side: u32| (1..=MAX_INPUT_SIDE).contains(&side);
    if !valid(width) || !valid(height) {
        anyhow::bail!(
            "Invalid input size {}x{}: each side must be between 1 and {}",
            width,
            height,
            MAX_INPUT_SIDE
        );
    }
    Ok((width, height))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl FromStr for ExecutionProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => anyhow::bail!(
                "{} is not a supported execution provider. Use either `cpu` or `cuda`.",
                other
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model_path: String,
    /// Plain-text labels file overriding the names embedded in the model.
    pub labels_path: Option<String>,
    /// (width, height). `None` defers to the model metadata.
    pub input_size: Option<(u32, u32)>,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let model_path = env::var("MODEL_PATH").unwrap_or_else(|_| "last.onnx".to_string());

        let labels_path = env::var("LABELS_PATH").ok().filter(|s| !s.trim().is_empty());

        let input_width: Option<u32> = env::var("INPUT_WIDTH").ok().and_then(|s| s.parse().ok());
        let input_height: Option<u32> =
            env::var("INPUT_HEIGHT").ok().and_then(|s| s.parse().ok());
        let input_size = match (input_width, input_height) {
            (Some(w), Some(h)) => Some((w, h)),
            (Some(s), None) | (None, Some(s)) => Some((s, s)),
            (None, None) => None,
        }
        .map(validate_input_size)
        .transpose()?;

        let confidence_threshold = env::var("CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.25);

        let iou_threshold = env::var("IOU_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.7);

        let max_detections = env::var("MAX_DETECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        let execution_provider = match env::var("EXECUTION_PROVIDER") {
            Ok(value) => value.parse()?,
            Err(_) => ExecutionProvider::Cpu,
        };

        let intra_threads = env::var("INTRA_THREADS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4);

        Ok(Self {
            model_path,
            labels_path,
            input_size,
            confidence_threshold,
            iou_threshold,
            max_detections,
            execution_provider,
            intra_threads,
        })
    }

    /// Create default configuration for testing
    pub fn test_default() -> Self {
        Self {
            model_path: "/models/model.onnx".to_string(),
            labels_path: None,
            input_size: Some(DEFAULT_INPUT_SIZE),
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            execution_provider: ExecutionProvider::Cpu,
            intra_threads: 1,
        }
    }
}
