use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};
use inference::{
    Detection,
    annotate::annotate,
    processing::{
        post::PostProcessor,
        pre::{PreProcessor, TransformParams},
    },
};
use ndarray::{Array, IxDyn};

const ANCHORS: usize = 8400;
const NUM_CLASSES: usize = 80;

/// Gradient image, more realistic than a solid color for the resizer
fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 255) / width) as u8,
            ((y * 255) / height) as u8,
            (((x + y) * 127) / (width + height)) as u8,
        ])
    })
}

/// YOLO output [1, 84, 8400] with `num_detections` confident, spread-out boxes
fn create_mock_yolo_output(num_detections: usize) -> Array<f32, IxDyn> {
    let mut output = Array::zeros(IxDyn(&[1, 4 + NUM_CLASSES, ANCHORS]));

    for i in 0..num_detections.min(ANCHORS) {
        output[[0, 0, i]] = 20.0 + (i % 30) as f32 * 20.0;
        output[[0, 1, i]] = 20.0 + (i / 30) as f32 * 20.0;
        output[[0, 2, i]] = 15.0;
        output[[0, 3, i]] = 15.0;
        output[[0, 4 + i % NUM_CLASSES, i]] = 0.9;
    }

    output
}

fn benchmark_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");

    let resolutions = [(640, 480), (1280, 720), (1920, 1080)];

    for (width, height) in resolutions.iter() {
        let image = gradient_image(*width, *height);
        let mut preprocessor = PreProcessor::default();

        group.bench_with_input(
            BenchmarkId::new("letterbox", format!("{}x{}", width, height)),
            &image,
            |b, image| {
                b.iter(|| preprocessor.preprocess(black_box(image)).unwrap());
            },
        );
    }

    group.finish();
}

fn benchmark_postprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("postprocessing");
    let post_processor = PostProcessor::new(0.25, 0.7, 300);
    let transform = TransformParams {
        orig_width: 1920,
        orig_height: 1080,
        input_width: 640,
        input_height: 640,
        scale: 1.0 / 3.0,
        offset_x: 0.0,
        offset_y: 140.0,
    };

    for num_detections in [0, 5, 50, 500] {
        let output = create_mock_yolo_output(num_detections);

        group.bench_with_input(
            BenchmarkId::new("parse_detections", num_detections),
            &output,
            |b, output| {
                b.iter(|| {
                    post_processor
                        .parse_detections(black_box(&output.view()), black_box(&transform))
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn benchmark_annotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("annotation");
    let image = gradient_image(1280, 720);

    for count in [1, 10, 50] {
        let detections: Vec<Detection> = (0..count)
            .map(|i| Detection {
                bbox: [
                    (i * 20) as f32,
                    (i * 10) as f32,
                    (i * 20 + 200) as f32,
                    (i * 10 + 150) as f32,
                ],
                confidence: 0.8,
                class_id: i as u32,
                class_name: "FireExtinguisher".to_string(),
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("annotate", count), &detections, |b, dets| {
            b.iter(|| annotate(black_box(&image), black_box(dets)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_preprocessing,
    benchmark_postprocessing,
    benchmark_annotation
);
criterion_main!(benches);
