//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all portal metrics
pub const METRICS_PREFIX: &str = "kca_portal";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 150ms for non-chat routes
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.075,  // 75ms
    0.100,  // 100ms
    0.150,  // 150ms - P99 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Buckets for chat-completion latency (upstream model calls are slow)
pub const COMPLETION_BUCKETS: &[f64] = &[
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    20.00,  // 20s
    30.00,  // 30s
];

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
        format!("{}_chat_completions_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat-completion calls"
    );

    describe_histogram!(
        format!("{}_chat_completion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Chat-completion latency in seconds"
    );

    describe_counter!(
        format!("{}_chat_completion_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total failed chat-completion calls"
    );

    describe_gauge!(
        format!("{}_chat_citations_count", METRICS_PREFIX),
        Unit::Count,
        "Number of citations attached to the last answer"
    );

    describe_gauge!(
        format!("{}_chat_sessions_active", METRICS_PREFIX),
        Unit::Count,
        "Chat sessions currently held in memory"
    );

    // Board and directory metrics
    describe_counter!(
        format!("{}_notice_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Total notice board writes"
    );

    describe_counter!(
        format!("{}_contact_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Total contact directory writes"
    );

    // Eligibility metrics
    describe_counter!(
        format!("{}_eligibility_assessments_total", METRICS_PREFIX),
        Unit::Count,
        "Total eligibility assessments"
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

/// Helper to record chat-completion metrics
pub fn record_completion(duration_secs: f64, model: &str, citations: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_chat_completions_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_chat_completion_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);

        gauge!(format!("{}_chat_citations_count", METRICS_PREFIX)).set(citations as f64);
    } else {
        counter!(
            format!("{}_chat_completion_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

/// Helper to record the number of live chat sessions
pub fn record_sessions(active: usize) {
    gauge!(format!("{}_chat_sessions_active", METRICS_PREFIX)).set(active as f64);
}

/// Helper to record notice board writes
pub fn record_notice_write(operation: &str) {
    counter!(
        format!("{}_notice_writes_total", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Helper to record contact directory writes
pub fn record_contact_write(operation: &str) {
    counter!(
        format!("{}_contact_writes_total", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Helper to record eligibility assessments
pub fn record_assessment(kind: &str, eligible: bool) {
    counter!(
        format!("{}_eligibility_assessments_total", METRICS_PREFIX),
        "kind" => kind.to_string(),
        "eligible" => eligible.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        for buckets in [LATENCY_BUCKETS, COMPLETION_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }

        // P50 target (50ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.050));
        // P99 target (150ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.150));
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("POST", "/api/chat");
        std::thread::sleep(std::time::Duration::from_millis(5));
        metrics.finish(200);
        // No recorder installed; just verify it runs without panic
        record_completion(0.4, "gpt-3.5-turbo", 3, true);
        record_completion(0.0, "gpt-3.5-turbo", 0, false);
    }
}
