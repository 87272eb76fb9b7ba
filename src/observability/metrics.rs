// ============================================================================
// PROMETHEUS METRICS
// ============================================================================
// Counters and histograms for HTTP traffic and the discount code engine
// ============================================================================

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    // ========================================================================
    // HTTP REQUEST METRICS
    // ========================================================================

    /// Total de requests HTTP por método, endpoint y status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "endpoint", "status"]
    )
    .unwrap();

    /// Duración de requests HTTP en segundos
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "endpoint"],
        vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========================================================================
    // DISCOUNT CODE METRICS
    // ========================================================================

    /// Issuance attempts by result (success / error)
    pub static ref DISCOUNT_CODES_ISSUED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "discount_codes_issued_total",
        "Total number of discount code issuance calls",
        &["status"]
    )
    .unwrap();

    /// Candidate codes rejected because they were already taken
    pub static ref DISCOUNT_CODE_COLLISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "discount_code_collisions_total",
        "Candidate codes that collided with an existing code",
        &["stage"]
    )
    .unwrap();

    /// Redemption results by outcome
    pub static ref DISCOUNT_CODE_REDEMPTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "discount_code_redemptions_total",
        "Total number of discount code redemption attempts",
        &["outcome"]
    )
    .unwrap();

    /// Engine operation latency, store round-trips included
    pub static ref DISCOUNT_OPERATION_DURATION: HistogramVec = register_histogram_vec!(
        "discount_operation_duration_seconds",
        "Time spent issuing or redeeming discount codes",
        &["operation"],
        vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]
    )
    .unwrap();
}

/// Helper para registrar una request HTTP
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration_secs);
}

pub fn record_code_issued(success: bool) {
    let status = if success { "success" } else { "error" };
    DISCOUNT_CODES_ISSUED_TOTAL.with_label_values(&[status]).inc();
}

/// `stage` is `precheck` (seen by `exists`) or `insert` (lost at the unique index).
pub fn record_code_collision(stage: &str) {
    DISCOUNT_CODE_COLLISIONS_TOTAL.with_label_values(&[stage]).inc();
}

pub fn record_redemption_outcome(outcome: &str) {
    DISCOUNT_CODE_REDEMPTIONS_TOTAL
        .with_label_values(&[outcome])
        .inc();
}
