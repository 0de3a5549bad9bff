pub mod annotate;
pub mod backend;
pub mod config;
pub mod detection;
pub mod detector;
pub mod labels;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{ExecutionProvider, InferenceConfig};
pub use detection::{Detection, InferenceResult};
pub use detector::Detector;
pub use labels::{LabelTable, UNKNOWN_LABEL};

#[cfg(feature = "ort-backend")]
pub use backend::ort::OrtBackend;
