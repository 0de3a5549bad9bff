use crate::labels::LabelTable;
use crate::processing::post::RawDetection;
use image::RgbImage;
use serde::Serialize;

/// One predicted object, as returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// `[x1, y1, x2, y2]` in original-image pixels.
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: u32,
    pub class_name: String,
}

impl Detection {
    pub fn from_raw(raw: &RawDetection, labels: &LabelTable) -> Self {
        Self {
            bbox: [raw.x1, raw.y1, raw.x2, raw.y2],
            confidence: raw.confidence,
            class_id: raw.class_id,
            class_name: labels.name(raw.class_id).to_string(),
        }
    }
}

/// Detections for one image plus the image with them drawn in.
pub struct InferenceResult {
    pub detections: Vec<Detection>,
    pub annotated: RgbImage,
}
