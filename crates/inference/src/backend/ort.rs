use super::{InferenceBackend, InferenceOutput};
use crate::config::{ExecutionProvider, InferenceConfig, validate_input_size};
use crate::labels::LabelTable;
use anyhow::Context;
use ndarray::{Array, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use std::path::Path;

/// Metadata keys written by `yolo export format=onnx`.
const NAMES_KEY: &str = "names";
const IMGSZ_KEY: &str = "imgsz";

pub struct OrtBackend {
    session: Session,
    labels: LabelTable,
    input_size: Option<(u32, u32)>,
}

impl OrtBackend {
    /// Load model with specified execution provider
    pub fn load_model_with_provider(
        config: &InferenceConfig,
        provider: ExecutionProvider,
    ) -> anyhow::Result<Self> {
        let path = config.model_path.as_str();
        if !Path::new(path).exists() {
            anyhow::bail!("Model file not found: {}", path);
        }

        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads)?;

        match provider {
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path))?;

        let (names, imgsz) = read_metadata(&session);

        let labels = match &config.labels_path {
            Some(labels_path) => {
                let text = std::fs::read_to_string(labels_path)
                    .with_context(|| format!("Failed to read labels file {}", labels_path))?;
                tracing::info!(labels_path = %labels_path, "Using labels file");
                LabelTable::from_lines(&text)
            }
            None => match names {
                Some(names) => LabelTable::from_metadata(&names)?,
                None => {
                    tracing::warn!(
                        "Model has no '{}' metadata; every class will be reported as Unknown",
                        NAMES_KEY
                    );
                    LabelTable::default()
                }
            },
        };

        let input_size = imgsz.as_deref().and_then(parse_imgsz);

        tracing::info!(
            num_classes = labels.len(),
            input_size = ?input_size,
            "Model loaded from {}",
            path
        );

        Ok(Self {
            session,
            labels,
            input_size,
        })
    }
}

impl InferenceBackend for OrtBackend {
    fn load_model(config: &InferenceConfig) -> anyhow::Result<Self> {
        Self::load_model_with_provider(config, config.execution_provider)
    }

    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(images.view())?])?;

        let predictions = outputs[0].try_extract_array::<f32>()?;

        Ok(InferenceOutput {
            predictions: predictions.into_owned(),
        })
    }

    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn input_size(&self) -> Option<(u32, u32)> {
        self.input_size
    }
}

fn read_metadata(session: &Session) -> (Option<String>, Option<String>) {
    let metadata = match session.metadata() {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read model metadata");
            return (None, None);
        }
    };

    let names = metadata.custom(NAMES_KEY);
    let imgsz = metadata.custom(IMGSZ_KEY);
    (names, imgsz)
}

/// `imgsz` is stored as `[height, width]`; returns (width, height).
fn parse_imgsz(value: &str) -> Option<(u32, u32)> {
    let dims: Vec<u32> = value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().parse().ok())
        .collect::<Option<Vec<u32>>>()?;

    let size = match dims.as_slice() {
        [size] => (*size, *size),
        [height, width] => (*width, *height),
        _ => return None,
    };

    validate_input_size(size).ok()
}
