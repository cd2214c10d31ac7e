use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, IntCounterVec, TextEncoder, histogram_opts, opts,
    register_histogram, register_int_counter_vec,
};

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!("http_requests_total", "Total HTTP requests"),
        &["path", "status"]
    )
    .unwrap()
});

/// Webhook processing outcomes: created, duplicate, invalid_signature,
/// validation_error, error.
pub static WEBHOOK_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!("webhook_requests_total", "Webhook processing outcomes"),
        &["result"]
    )
    .unwrap()
});

pub static REQUEST_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(histogram_opts!(
        "request_latency_ms",
        "Request latency in milliseconds",
        vec![50.0, 100.0, 200.0, 500.0, 1000.0]
    ))
    .unwrap()
});

pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}
