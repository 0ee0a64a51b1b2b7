//! Metrics and observability utilities
//!
//! Provides Prometheus metrics for the research pipeline with
//! standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all SynthesisTalk metrics
pub const METRICS_PREFIX: &str = "synthesis_talk";

/// Histogram buckets for HTTP request latency (in seconds)
///
/// Chat turns with reasoning issue several sequential model calls,
/// so the tail reaches well past a minute.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.010,  // 10ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 1m
    120.0,  // 2m
];

/// Buckets for a single provider call
pub const PROVIDER_BUCKETS: &[f64] = &[
    0.100,
    0.250,
    0.500,
    1.000,
    2.000,
    5.000,
    10.00,
    30.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
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

    // Provider calls
    describe_counter!(
        format!("{}_llm_calls_total", METRICS_PREFIX),
        Unit::Count,
        "Total LLM completion calls by purpose and status"
    );

    describe_histogram!(
        format!("{}_llm_call_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "LLM completion latency in seconds"
    );

    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total web search provider calls"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Web search latency in seconds"
    );

    // Reasoning
    describe_counter!(
        format!("{}_reasoning_step_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Reasoning steps whose model call failed"
    );

    describe_counter!(
        format!("{}_synthesis_degraded_total", METRICS_PREFIX),
        Unit::Count,
        "Syntheses that fell back to an error answer"
    );

    // Cache
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total search cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total search cache misses"
    );

    // Documents
    describe_counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total documents ingested"
    );

    describe_counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks created"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Document extraction and chunking latency in seconds"
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

/// Record one LLM completion call
///
/// `purpose` is one of `chat`, `step`, `synthesis`, `summary`, `visualization`.
pub fn record_llm_call(purpose: &'static str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_llm_calls_total", METRICS_PREFIX),
        "purpose" => purpose,
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_llm_call_duration_seconds", METRICS_PREFIX),
        "purpose" => purpose
    )
    .record(duration_secs);
}

/// Record one web search provider call
pub fn record_search(duration_secs: f64, result_count: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);
        tracing::debug!(result_count, "Search results recorded");
    }
}

pub fn record_step_failure(action: &str) {
    counter!(
        format!("{}_reasoning_step_failures_total", METRICS_PREFIX),
        "action" => action.to_string()
    )
    .increment(1);
}

pub fn record_synthesis_degraded() {
    counter!(format!("{}_synthesis_degraded_total", METRICS_PREFIX)).increment(1);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool) {
    if hit {
        counter!(format!("{}_cache_hits_total", METRICS_PREFIX)).increment(1);
    } else {
        counter!(format!("{}_cache_misses_total", METRICS_PREFIX)).increment(1);
    }
}

/// Helper to record ingestion metrics
pub fn record_ingestion(duration_secs: f64, chunks_created: usize, content_type: &str) {
    counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        "content_type" => content_type.to_string()
    )
    .increment(1);

    counter!(format!("{}_chunks_created_total", METRICS_PREFIX))
        .increment(chunks_created as u64);

    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX))
        .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ascending(buckets: &[f64]) {
        let mut prev = 0.0;
        for &bucket in buckets {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_buckets_are_sorted() {
        assert_ascending(LATENCY_BUCKETS);
        assert_ascending(PROVIDER_BUCKETS);
        // Long reasoning turns must land in a finite bucket
        assert!(LATENCY_BUCKETS.contains(&120.0));
    }

    #[test]
    fn test_recorders_run_without_exporter() {
        let metrics = RequestMetrics::start("POST", "/api/llm");
        metrics.finish(200);
        record_llm_call("step", 0.4, false);
        record_cache(true);
        record_ingestion(0.01, 3, "text/plain");
    }
}
