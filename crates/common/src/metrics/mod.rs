//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all QuickOnboard metrics
pub const METRICS_PREFIX: &str = "quickonboard";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00, 30.00,
];

/// Buckets for remote model calls (embedding and generation)
pub const UPSTREAM_BUCKETS: &[f64] = &[
    0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 5.000, 10.00, 30.00, 60.00,
];

/// Histograms that time remote model calls and use [`UPSTREAM_BUCKETS`]
pub fn upstream_histograms() -> [String; 2] {
    [
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
    ]
}

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Chat metrics
    describe_counter!(
        format!("{}_chat_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat questions answered"
    );

    describe_histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Similarity search latency in seconds"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Answer generation latency in seconds"
    );

    // Ingestion metrics
    describe_counter!(
        format!("{}_documents_processed_total", METRICS_PREFIX),
        Unit::Count,
        "Documents processed, labelled by outcome"
    );

    describe_counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks created"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Document processing latency in seconds"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_batches_total", METRICS_PREFIX),
        Unit::Count,
        "Embedding API batches, labelled by outcome"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding batch latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one answered chat question
pub fn record_chat(retrieval_secs: f64, generation_secs: Option<f64>, chunks_used: usize) {
    counter!(
        format!("{}_chat_queries_total", METRICS_PREFIX),
        "grounded" => (chunks_used > 0).to_string()
    )
    .increment(1);

    histogram!(format!("{}_retrieval_duration_seconds", METRICS_PREFIX)).record(retrieval_secs);

    if let Some(secs) = generation_secs {
        histogram!(format!("{}_generation_duration_seconds", METRICS_PREFIX)).record(secs);
    }
}

/// Record one embedding batch
pub fn record_embedding(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_batches_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

/// Record the outcome of processing one document
pub fn record_ingestion(duration_secs: f64, chunks_created: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_documents_processed_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);

    if success {
        counter!(format!("{}_chunks_created_total", METRICS_PREFIX))
            .increment(chunks_created as u64);
    }

    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [LATENCY_BUCKETS, UPSTREAM_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }
    }

    #[test]
    fn test_upstream_histograms_are_model_calls() {
        let names = upstream_histograms();
        assert!(names.iter().all(|n| n.starts_with("quickonboard_")));
        assert!(names.contains(&"quickonboard_embedding_duration_seconds".to_string()));
        assert!(names.contains(&"quickonboard_generation_duration_seconds".to_string()));
        assert!(!names.contains(&"quickonboard_request_duration_seconds".to_string()));
    }

    #[test]
    fn test_recorders_without_exporter() {
        let metrics = RequestMetrics::start("POST", "/v1/workspaces/{ws}/chat");
        metrics.finish(200);
        record_chat(0.01, None, 0);
        record_embedding(0.2, "embedding-001", false);
        record_ingestion(1.5, 12, true);
    }
}
