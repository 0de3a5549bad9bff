use super::pre::TransformParams;
use ndarray::ArrayViewD;
use std::cmp::Ordering;

/// A model detection before class names are attached, in original-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl RawDetection {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &RawDetection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    /// Parse detections from YOLO output.
    ///
    /// Expects `[1, 4 + num_classes, anchors]` with boxes as cxcywh in model-input
    /// pixels and per-class scores already in `[0, 1]`. The transposed
    /// `[1, anchors, 4 + num_classes]` layout is accepted too.
    ///
    /// Output is sorted by descending confidence.
    #[tracing::instrument(skip_all)]
    pub fn parse_detections(
        &self,
        predictions: &ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<RawDetection>> {
        let shape = predictions.shape();
        if shape.len() != 3 {
            anyhow::bail!("Unexpected output rank {} (shape {:?}), expected 3", shape.len(), shape);
        }
        if shape[1] == 0 || shape[2] == 0 {
            return Ok(Vec::new());
        }

        // Anchors always outnumber channels for real exports (8400 vs 84)
        let transposed = shape[1] > shape[2];
        let (channels, anchors) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };

        if channels < 5 {
            anyhow::bail!(
                "Unexpected output shape {:?}: need 4 box channels plus at least one class",
                shape
            );
        }

        let value = |channel: usize, anchor: usize| -> f32 {
            if transposed {
                predictions[[0, anchor, channel]]
            } else {
                predictions[[0, channel, anchor]]
            }
        };

        let mut candidates = Vec::new();

        for i in 0..anchors {
            let mut max_score = f32::NEG_INFINITY;
            let mut class_idx = 0usize;
            for c in 4..channels {
                let score = value(c, i);
                if score > max_score {
                    max_score = score;
                    class_idx = c - 4;
                }
            }

            if max_score.is_nan() || max_score < self.confidence_threshold {
                continue;
            }

            let (x1_input, y1_input, x2_input, y2_input) =
                cxcywh_to_xyxy(value(0, i), value(1, i), value(2, i), value(3, i));

            let (x1, y1) = transform.to_original(x1_input, y1_input);
            let (x2, y2) = transform.to_original(x2_input, y2_input);

            candidates.push(RawDetection {
                x1,
                y1,
                x2,
                y2,
                confidence: max_score.clamp(0.0, 1.0),
                class_id: class_idx as u32,
            });
        }

        let candidate_count = candidates.len();
        let detections = non_max_suppression(candidates, self.iou_threshold, self.max_detections);

        tracing::trace!(
            anchors,
            candidate_count,
            kept = detections.len(),
            "Decoded detections"
        );

        Ok(detections)
    }
}

/// Class-aware greedy NMS. Keeps at most `max_detections`, highest confidence first.
pub fn non_max_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<RawDetection> = Vec::new();

    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }

        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold
        });

        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    /// Helper to create a default PostProcessor for tests
    fn test_postprocessor() -> PostProcessor {
        PostProcessor::new(0.25, 0.7, 300)
    }

    /// Helper to create TransformParams for a 640x640 model input
    fn test_transform(
        orig_width: u32,
        orig_height: u32,
        scale: f32,
        offset_x: f32,
        offset_y: f32,
    ) -> TransformParams {
        TransformParams {
            orig_width,
            orig_height,
            input_width: 640,
            input_height: 640,
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Helper to create YOLO format output [1, 4 + num_classes, anchors]
    ///
    /// Each given box gets `score` for its class and 0.0 for the rest. The
    /// remaining anchors (up to MIN_ANCHORS) score zero everywhere, keeping
    /// anchors > channels like a real export.
    fn create_yolo_output(
        boxes_cxcywh: Vec<[f32; 4]>,
        class_scores: Vec<(usize, f32)>,
        num_classes: usize,
    ) -> Array<f32, IxDyn> {
        const MIN_ANCHORS: usize = 64;
        let n = boxes_cxcywh.len().max(MIN_ANCHORS);
        let channels = 4 + num_classes;
        let mut output = Array::zeros(IxDyn(&[1, channels, n]));

        for (i, (b, (class_idx, score))) in boxes_cxcywh.iter().zip(class_scores).enumerate() {
            for (c, v) in b.iter().enumerate() {
                output[[0, c, i]] = *v;
            }
            output[[0, 4 + class_idx, i]] = score;
        }

        output
    }

    fn identity() -> TransformParams {
        test_transform(640, 640, 1.0, 0.0, 0.0)
    }

    /// Test cxcywh to xyxy conversion
    #[test]
    fn test_cxcywh_to_xyxy() {
        let (x1, y1, x2, y2) = cxcywh_to_xyxy(320.0, 240.0, 100.0, 50.0);
        assert_eq!((x1, y1, x2, y2), (270.0, 215.0, 370.0, 265.0));
    }

    /// Test IoU of identical, disjoint and overlapping boxes
    #[test]
    fn test_iou() {
        let a = RawDetection {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
            confidence: 0.9,
            class_id: 0,
        };
        let b = RawDetection {
            x1: 5.0,
            x2: 15.0,
            ..a
        };
        let far = RawDetection {
            x1: 100.0,
            x2: 110.0,
            ..a
        };

        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&far), 0.0);
        // intersection 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    /// Test that confidence threshold filters detections correctly
    #[test]
    fn test_confidence_threshold_filtering() {
        let boxes = vec![
            [100.0, 100.0, 50.0, 50.0],
            [300.0, 300.0, 50.0, 50.0],
            [500.0, 500.0, 50.0, 50.0],
        ];
        let scores = vec![(0, 0.2), (1, 0.25), (2, 0.8)];
        let output = create_yolo_output(boxes, scores, 3);

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity())
            .unwrap();

        // 0.2 filtered, 0.25 is the inclusive boundary
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class_id, 2);
        assert!((detections[0].confidence - 0.8).abs() < 1e-6);
        assert_eq!(detections[1].class_id, 1);
    }

    /// Test argmax picks the best class per anchor
    #[test]
    fn test_argmax_class_selection() {
        let mut output = create_yolo_output(vec![[320.0, 320.0, 40.0, 40.0]], vec![(0, 0.3)], 4);
        output[[0, 4 + 3, 0]] = 0.9;

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity())
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 3);
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
    }

    /// Test coordinate inverse transformation with known values
    #[test]
    fn test_coordinate_inverse_transformation() {
        // Original 1280x960 into 640x640: scale 0.5, resized 640x480, offset_y 80
        // Box cxcywh (320, 320, 100, 100) -> xyxy (270, 270, 370, 370) in input space
        //   x1 = (270 - 0) / 0.5 = 540, y1 = (270 - 80) / 0.5 = 380
        //   x2 = (370 - 0) / 0.5 = 740, y2 = (370 - 80) / 0.5 = 580
        let output = create_yolo_output(vec![[320.0, 320.0, 100.0, 100.0]], vec![(0, 0.9)], 1);
        let transform = test_transform(1280, 960, 0.5, 0.0, 80.0);

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert!((det.x1 - 540.0).abs() < 0.1, "x1 incorrect: {}", det.x1);
        assert!((det.y1 - 380.0).abs() < 0.1, "y1 incorrect: {}", det.y1);
        assert!((det.x2 - 740.0).abs() < 0.1, "x2 incorrect: {}", det.x2);
        assert!((det.y2 - 580.0).abs() < 0.1, "y2 incorrect: {}", det.y2);
    }

    /// Test that coordinates are clamped to image bounds
    #[test]
    fn test_coordinates_clamped_to_image_bounds() {
        let boxes = vec![[10.0, 10.0, 100.0, 100.0], [630.0, 470.0, 100.0, 100.0]];
        let output = create_yolo_output(boxes, vec![(0, 0.9), (1, 0.8)], 2);
        let transform = test_transform(640, 480, 1.0, 0.0, 0.0);

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert_eq!(detections.len(), 2);
        for det in &detections {
            assert!(det.x1 >= 0.0 && det.x2 <= 640.0, "x out of bounds: {:?}", det);
            assert!(det.y1 >= 0.0 && det.y2 <= 480.0, "y out of bounds: {:?}", det);
        }
        assert_eq!(detections[0].x1, 0.0);
        assert_eq!(detections[1].x2, 640.0);
        assert_eq!(detections[1].y2, 480.0);
    }

    /// Test overlapping boxes of the same class are suppressed, other classes kept
    #[test]
    fn test_nms_is_class_aware() {
        let boxes = vec![
            [320.0, 320.0, 100.0, 100.0],
            [322.0, 322.0, 100.0, 100.0], // same class, heavy overlap -> suppressed
            [322.0, 322.0, 100.0, 100.0], // different class -> kept
            [100.0, 100.0, 50.0, 50.0],   // same class, no overlap -> kept
        ];
        let scores = vec![(0, 0.9), (0, 0.85), (1, 0.6), (0, 0.5)];
        let output = create_yolo_output(boxes, scores, 2);

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity())
            .unwrap();

        assert_eq!(detections.len(), 3);
        let confidences: Vec<f32> = detections.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.6, 0.5]);
    }

    /// Test the max detections cap
    #[test]
    fn test_max_detections() {
        let boxes: Vec<[f32; 4]> = (0..10)
            .map(|i| [30.0 + i as f32 * 60.0, 30.0, 20.0, 20.0])
            .collect();
        let scores: Vec<(usize, f32)> = (0..10).map(|i| (0, 0.3 + i as f32 * 0.05)).collect();
        let output = create_yolo_output(boxes, scores, 1);

        let postprocessor = PostProcessor::new(0.25, 0.7, 4);
        let detections = postprocessor
            .parse_detections(&output.view(), &identity())
            .unwrap();

        assert_eq!(detections.len(), 4);
        assert!(detections[0].confidence > detections[3].confidence);
    }

    /// Test transposed [1, anchors, channels] layout
    #[test]
    fn test_transposed_layout() {
        let output = create_yolo_output(
            (0..8).map(|i| [40.0 + i as f32 * 70.0, 300.0, 30.0, 30.0]).collect(),
            (0..8).map(|i| (i % 2, 0.9)).collect(),
            2,
        );
        let transposed = output.permuted_axes(IxDyn(&[0, 2, 1]));
        assert_eq!(transposed.shape(), &[1, 64, 6]);

        let detections = test_postprocessor()
            .parse_detections(&transposed.view(), &identity())
            .unwrap();

        assert_eq!(detections.len(), 8);
    }

    /// Test confidences always land in [0, 1]
    #[test]
    fn test_confidence_clamped() {
        let output = create_yolo_output(vec![[320.0, 320.0, 10.0, 10.0]], vec![(0, 1.7)], 1);

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity())
            .unwrap();

        assert_eq!(detections[0].confidence, 1.0);
    }

    /// Test malformed shapes
    #[test]
    fn test_malformed_output_shapes() {
        let postprocessor = test_postprocessor();

        let rank2 = Array::<f32, _>::zeros(IxDyn(&[84, 8400]));
        assert!(postprocessor.parse_detections(&rank2.view(), &identity()).is_err());

        let too_few_channels = Array::<f32, _>::zeros(IxDyn(&[1, 4, 8400]));
        assert!(
            postprocessor
                .parse_detections(&too_few_channels.view(), &identity())
                .is_err()
        );

        let no_anchors = Array::<f32, _>::zeros(IxDyn(&[1, 84, 0]));
        assert!(
            postprocessor
                .parse_detections(&no_anchors.view(), &identity())
                .unwrap()
                .is_empty()
        );
    }
}
