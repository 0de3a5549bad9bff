use crate::{config::InferenceConfig, labels::LabelTable};
use ndarray::{Array, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

/// A loaded detection model.
///
/// `infer` takes `&mut self`: a backend runs one inference at a time and is
/// not safe for concurrent use. Callers sharing one instance across
/// requests must serialize access (the API server holds it behind a mutex).
pub trait InferenceBackend {
    fn load_model(config: &InferenceConfig) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run inference on a `[1, 3, H, W]` tensor with values in `[0, 1]`.
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;

    /// Class names owned by the model.
    fn labels(&self) -> &LabelTable;

    /// (width, height) the model was exported with, when it records one.
    fn input_size(&self) -> Option<(u32, u32)> {
        None
    }
}

pub struct InferenceOutput {
    pub predictions: ndarray::ArrayD<f32>, // [1, 4 + num_classes, anchors] cxcywh in input pixels
}
