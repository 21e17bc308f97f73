//! Metrics and observability utilities
//!
//! Provides Prometheus metrics for the citation pipeline
//! with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all Caselink metrics
pub const METRICS_PREFIX: &str = "caselink";

/// Buckets for per-document link latency (in seconds).
/// Matching hits the database once per citation, so long opinions are slow.
pub const LINK_BUCKETS: &[f64] = &[
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
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_documents_linked_total", METRICS_PREFIX),
        Unit::Count,
        "Total opinions processed by the citation linker"
    );

    describe_counter!(
        format!("{}_documents_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Total opinions whose linking failed permanently"
    );

    describe_counter!(
        format!("{}_citations_extracted_total", METRICS_PREFIX),
        Unit::Count,
        "Total citations found in opinion text"
    );

    describe_counter!(
        format!("{}_citations_resolved_total", METRICS_PREFIX),
        Unit::Count,
        "Total citations resolved to exactly one opinion"
    );

    describe_counter!(
        format!("{}_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Total retries caused by transient backend failures"
    );

    describe_histogram!(
        format!("{}_link_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Citation linking latency per opinion in seconds"
    );

    describe_counter!(
        format!("{}_queue_messages_processed_total", METRICS_PREFIX),
        Unit::Count,
        "Total queue messages processed"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record a linked document
pub fn record_document_linked(duration_secs: f64, extracted: usize, resolved: usize) {
    counter!(format!("{}_documents_linked_total", METRICS_PREFIX)).increment(1);

    counter!(format!("{}_citations_extracted_total", METRICS_PREFIX))
        .increment(extracted as u64);

    counter!(format!("{}_citations_resolved_total", METRICS_PREFIX))
        .increment(resolved as u64);

    histogram!(format!("{}_link_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record a document that could not be linked
pub fn record_document_failed(reason: &str) {
    counter!(
        format!("{}_documents_failed_total", METRICS_PREFIX),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Helper to record a retry of a transient failure
pub fn record_retry(operation: &str) {
    counter!(
        format!("{}_retries_total", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Helper to record queue message handling
pub fn record_queue_message(queue: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_queue_messages_processed_total", METRICS_PREFIX),
        "queue" => queue.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
