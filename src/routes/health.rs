// ============================================================================
// Health and Metrics Routes
// ============================================================================
//
// Endpoints:
// - GET /health/live - Liveness probe (always succeeds)
// - GET /health/ready - Readiness probe (secret configured + database)
// - GET /metrics - Prometheus metrics
//
// ============================================================================

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;

use crate::context::AppContext;
use crate::db;
use crate::error::AppError;
use crate::metrics;

/// GET /health/live
pub async fn health_live() -> impl IntoResponse {
    Json(json!({"status": "live"}))
}

/// GET /health/ready
///
/// Ready only when the webhook secret is configured and the database
/// answers a trivial round-trip query.
pub async fn health_ready(
    State(app_context): State<Arc<AppContext>>,
) -> Result<impl IntoResponse, AppError> {
    if app_context.config.webhook_secret.is_empty() {
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"detail": "secret not set"})),
        ));
    }
    if !db::ready(&app_context.db_pool).await {
        tracing::error!("Readiness check failed: database not responding");
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"detail": "db not ready"})),
        ));
    }
    Ok((StatusCode::OK, Json(json!({"status": "ready"}))))
}

/// GET /metrics
/// Prometheus metrics endpoint
pub async fn metrics() -> Result<impl IntoResponse, AppError> {
    match metrics::gather_metrics() {
        Ok(metrics_data) => Ok((
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            metrics_data,
        )),
        Err(e) => {
            tracing::error!("Failed to gather metrics: {}", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain")],
                "Internal Server Error".to_string(),
            ))
        }
    }
}
