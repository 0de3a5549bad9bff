use crate::{
    annotate::annotate,
    backend::{InferenceBackend, InferenceOutput},
    config::{DEFAULT_INPUT_SIZE, InferenceConfig},
    detection::{Detection, InferenceResult},
    labels::LabelTable,
    processing::{post::PostProcessor, pre::PreProcessor},
};

/// Preprocess, run the model, decode and label detections for one image at a time.
pub struct Detector<B: InferenceBackend> {
    backend: B,
    preprocessor: PreProcessor,
    postprocessor: PostProcessor,
}

impl<B: InferenceBackend> Detector<B> {
    /// Input size comes from the config, then the model metadata, then the default.
    pub fn new(backend: B, config: &InferenceConfig) -> Self {
        let input_size = config
            .input_size
            .or_else(|| backend.input_size())
            .unwrap_or(DEFAULT_INPUT_SIZE);

        let preprocessor = PreProcessor::new(input_size);
        let postprocessor = PostProcessor::new(
            config.confidence_threshold,
            config.iou_threshold,
            config.max_detections,
        );

        Self {
            backend,
            preprocessor,
            postprocessor,
        }
    }

    pub fn labels(&self) -> &LabelTable {
        self.backend.labels()
    }

    pub fn input_size(&self) -> (u32, u32) {
        self.preprocessor.input_size
    }

    pub fn detect(&mut self, image: &image::RgbImage) -> anyhow::Result<Vec<Detection>> {
        let span = tracing::info_span!(
            "detect",
            width = image.width(),
            height = image.height()
        );
        let _enter = span.enter();

        let (input, transform) = self.preprocessor.preprocess(image)?;

        let InferenceOutput { predictions } = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            self.backend.infer(&input)?
        };

        let raw = self
            .postprocessor
            .parse_detections(&predictions.view(), &transform)?;

        let labels = self.backend.labels();
        let detections: Vec<Detection> = raw
            .iter()
            .map(|r| Detection::from_raw(r, labels))
            .collect();

        for det in &detections {
            tracing::debug!(
                class_name = %det.class_name,
                class_id = det.class_id,
                confidence = det.confidence,
                bbox = ?det.bbox,
                "Detected"
            );
        }

        Ok(detections)
    }

    /// Detect and render the annotated copy of `image`.
    pub fn predict(&mut self, image: &image::RgbImage) -> anyhow::Result<InferenceResult> {
        let detections = self.detect(image)?;
        let annotated = annotate(image, &detections);

        Ok(InferenceResult {
            detections,
            annotated,
        })
    }
}
