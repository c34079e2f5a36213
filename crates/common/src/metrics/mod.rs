//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions for the report
//! generation pipeline.

use metrics::{describe_counter, describe_histogram, Unit};

/// Metrics prefix for all Scribe metrics
pub const METRICS_PREFIX: &str = "scribe";

/// Register all metric descriptions
pub fn register_metrics() {
    // Report lifecycle
    describe_counter!(
        format!("{}_reports_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total report jobs created"
    );

    describe_counter!(
        format!("{}_reports_completed_total", METRICS_PREFIX),
        Unit::Count,
        "Total report jobs finished in completed status"
    );

    describe_counter!(
        format!("{}_reports_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Total report jobs finished in error status"
    );

    describe_histogram!(
        format!("{}_report_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end report generation latency in seconds"
    );

    // Section generation
    describe_counter!(
        format!("{}_sections_generated_total", METRICS_PREFIX),
        Unit::Count,
        "Total sections generated successfully"
    );

    describe_counter!(
        format!("{}_sections_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Total sections that failed generation"
    );

    describe_counter!(
        format!("{}_sections_persisted_total", METRICS_PREFIX),
        Unit::Count,
        "Total section rows persisted"
    );

    describe_histogram!(
        format!("{}_section_attempts", METRICS_PREFIX),
        Unit::Count,
        "Completion attempts used per section"
    );

    // Completion transport
    describe_counter!(
        format!("{}_completion_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total completion API requests"
    );

    describe_counter!(
        format!("{}_completion_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total completion API errors"
    );

    describe_histogram!(
        format!("{}_completion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Completion API latency in seconds"
    );

    // Corpus resolution
    describe_counter!(
        format!("{}_corpus_papers_resolved_total", METRICS_PREFIX),
        Unit::Count,
        "Total papers resolved into generation corpora"
    );

    describe_counter!(
        format!("{}_corpus_resolution_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Total mention resolutions that failed open to an empty list"
    );
}
