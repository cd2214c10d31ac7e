use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use uuid::Uuid;

use crate::metrics::{HTTP_REQUESTS_TOTAL, REQUEST_LATENCY_MS};

/// Request logging middleware
///
/// Assigns each request an id, logs the outcome as a structured event, and
/// feeds the request counter and latency histogram.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Incoming request"
    );

    let response = next.run(req).await;

    let latency_ms = start.elapsed().as_millis();
    let status = response.status();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&path, status.as_str()])
        .inc();
    REQUEST_LATENCY_MS.observe(latency_ms as f64);

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = %status.as_u16(),
        latency_ms = latency_ms,
        "Request completed"
    );

    response
}
