use crate::metrics::PredictMetrics;
use inference::{Detector, InferenceBackend};
use std::sync::{Arc, Mutex};

/// Router state. The detector is loaded once at startup and every request
/// takes the mutex for the duration of its model call.
pub struct AppState<B: InferenceBackend> {
    pub detector: Arc<Mutex<Detector<B>>>,
    pub metrics: PredictMetrics,
}

impl<B: InferenceBackend> AppState<B> {
    pub fn new(detector: Detector<B>) -> Self {
        Self {
            detector: Arc::new(Mutex::new(detector)),
            metrics: PredictMetrics::new(),
        }
    }
}

// Manual impl: deriving would require `B: Clone`
impl<B: InferenceBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            detector: Arc::clone(&self.detector),
            metrics: self.metrics.clone(),
        }
    }
}
