//! Metrics module for billing-portal.
//! Provides Prometheus metrics for payment, retrieval and adjustment flows,
//! plus the HTTP request metrics that `service_core`'s middleware records
//! through the `metrics` facade.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Encoder, HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "portal_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Payments committed, by resulting status
pub static PAYMENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Bill retrievals, by outcome
pub static RETRIEVALS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Adjustments committed
pub static ADJUSTMENTS_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Recorder behind the `metrics` facade (HTTP request counts and latency).
static HTTP_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once.
pub fn init_metrics() {
    PAYMENTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("portal_payments_total", "Total payments by resulting status"),
            &["status"]
        )
        .expect("Failed to register PAYMENTS_TOTAL")
    });

    RETRIEVALS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("portal_bill_retrievals_total", "Total bill retrievals by outcome"),
            &["outcome"]
        )
        .expect("Failed to register RETRIEVALS_TOTAL")
    });

    ADJUSTMENTS_TOTAL.get_or_init(|| {
        register_int_counter!(opts!(
            "portal_adjustments_total",
            "Total bill adjustments recorded"
        ))
        .expect("Failed to register ADJUSTMENTS_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("portal_errors_total", "Total errors by kind for alerting"),
            &["error_kind", "route"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });

    HTTP_METRICS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install HTTP metrics recorder")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    let mut text = String::from_utf8(buffer).unwrap_or_default();

    if let Some(handle) = HTTP_METRICS_HANDLE.get() {
        text.push_str(&handle.render());
    }
    text
}

/// Record a committed payment.
pub fn record_payment(status: &str) {
    if let Some(counter) = PAYMENTS_TOTAL.get() {
        counter.with_label_values(&[status]).inc();
    }
}

/// Record a bill retrieval outcome (`found`, `not_found`, `error`).
pub fn record_retrieval(outcome: &str) {
    if let Some(counter) = RETRIEVALS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record a committed adjustment.
pub fn record_adjustment() {
    if let Some(counter) = ADJUSTMENTS_TOTAL.get() {
        counter.inc();
    }
}

/// Record an error for alerting.
pub fn record_error(error_kind: &str, route: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_kind, route]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_payments_show_up_in_exposition() {
        init_metrics();
        record_payment("Fully Paid");

        let text = get_metrics();
        assert!(text.contains("portal_payments_total"));
        assert!(text.contains("status=\"Fully Paid\""));
    }

    #[test]
    fn init_is_idempotent() {
        init_metrics();
        init_metrics();
        assert!(!get_metrics().is_empty());
    }
}
