//! Metrics for backend calls and dashboard bookkeeping
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CaseDesk metrics
pub const METRICS_PREFIX: &str = "casedesk";

/// Buckets for backend latency; simulation and image generation are slow
pub const BACKEND_BUCKETS: &[f64] = &[
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
    60.00,  // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_backend_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total backend requests by operation and outcome"
    );

    describe_histogram!(
        format!("{}_backend_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Backend request latency in seconds"
    );

    describe_counter!(
        format!("{}_stale_completions_total", METRICS_PREFIX),
        Unit::Count,
        "Completions dropped because their case session was abandoned"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record one backend call
pub struct RequestMetrics {
    start: Instant,
    operation: &'static str,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    /// Record request completion
    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed().as_secs_f64();
        let outcome = if success { "success" } else { "error" };

        counter!(
            format!("{}_backend_requests_total", METRICS_PREFIX),
            "operation" => self.operation,
            "outcome" => outcome
        )
        .increment(1);

        histogram!(
            format!("{}_backend_request_duration_seconds", METRICS_PREFIX),
            "operation" => self.operation
        )
        .record(duration);
    }
}

/// Count a completion dropped for belonging to an abandoned session
pub fn record_stale_completion(operation: &'static str) {
    counter!(
        format!("{}_stale_completions_total", METRICS_PREFIX),
        "operation" => operation
    )
    .increment(1);
}
