use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Failure Metrics
    pub static ref API_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "api_failures_total",
        "Total classified API failures",
        &["error_code", "status"]
    )
    .unwrap();

    pub static ref RATE_LIMITED_REQUESTS_TOTAL: IntCounter = register_int_counter!(
        "rate_limited_requests_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();

    // Business Metrics
    pub static ref ORGANIZATIONS_TOTAL: IntGauge = register_int_gauge!(
        "organizations_total",
        "Number of organizations in the store"
    )
    .unwrap();
}

/// Initialize all metrics (called on startup)
pub fn init_metrics() {
    // Force lazy_static initialization
    lazy_static::initialize(&HTTP_REQUESTS_TOTAL);
    lazy_static::initialize(&HTTP_REQUEST_DURATION_SECONDS);
    lazy_static::initialize(&API_FAILURES_TOTAL);
    lazy_static::initialize(&RATE_LIMITED_REQUESTS_TOTAL);
    lazy_static::initialize(&ORGANIZATIONS_TOTAL);
}
