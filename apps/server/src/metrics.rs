//! Prometheus metrics

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Once;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("registrar_http_requests_total", "HTTP requests handled"),
        &["method", "route", "status"]
    )
    .expect("valid metric definition");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "registrar_http_request_duration_seconds",
            "HTTP request latency"
        ),
        &["method", "route"]
    )
    .expect("valid metric definition");
    pub static ref TRANSACTION_ROLLBACKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "registrar_transaction_rollbacks_total",
            "Store transactions rolled back after a failed step"
        ),
        &["operation"]
    )
    .expect("valid metric definition");
    pub static ref ENROLLMENT_ROWS_WRITTEN_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "registrar_enrollment_rows_written_total",
            "person_course rows inserted or deleted"
        ),
        &["action"]
    )
    .expect("valid metric definition");
}

static REGISTER: Once = Once::new();

/// Register all collectors with [`REGISTRY`]. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: [Box<dyn prometheus::core::Collector>; 4] = [
            Box::new(HTTP_REQUESTS_TOTAL.clone()),
            Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
            Box::new(TRANSACTION_ROLLBACKS_TOTAL.clone()),
            Box::new(ENROLLMENT_ROWS_WRITTEN_TOTAL.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                tracing::warn!(error = %e, "Failed to register metric");
            }
        }
    });
}

/// Render the registry in the Prometheus text format.
pub fn gather() -> crate::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| crate::Error::Internal(format!("Failed to encode metrics: {e}")))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::Error::Internal(format!("Metrics are not valid UTF-8: {e}")))
}
