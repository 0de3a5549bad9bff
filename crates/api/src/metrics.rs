use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};

const METER_NAME: &str = "api";

/// Request-level instruments; no-ops unless a meter provider is installed.
#[derive(Clone)]
pub struct PredictMetrics {
    duration: Histogram<f64>,
    detections: Counter<u64>,
}

impl PredictMetrics {
    pub fn new() -> Self {
        let meter = global::meter(METER_NAME);
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];

        let duration = meter
            .f64_histogram("predict_duration_seconds")
            .with_description("Time to serve one prediction (decode + infer + annotate + encode)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build();
        let detections = meter
            .u64_counter("predict_detections_total")
            .with_description("Total detections returned")
            .build();

        Self {
            duration,
            detections,
        }
    }

    pub fn record(&self, elapsed_secs: f64, detections: usize) {
        self.duration.record(elapsed_secs, &[]);
        self.detections.add(detections as u64, &[]);
    }
}

impl Default for PredictMetrics {
    fn default() -> Self {
        Self::new()
    }
}
