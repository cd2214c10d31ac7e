// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Main router assembly and middleware
// - webhook.rs: Signed webhook ingestion endpoint
// - messages.rs: Filtered/paginated message listing
// - stats.rs: Aggregate statistics endpoint
// - health.rs: Liveness/readiness probes and Prometheus metrics
// - middleware.rs: Request logging and per-request metrics
//
// ============================================================================

mod health;
mod messages;
mod middleware;
mod stats;
mod webhook;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    Router::new()
        // Health and monitoring
        .route("/health/live", get(health::health_live))
        .route("/health/ready", get(health::health_ready))
        .route("/metrics", get(health::metrics))
        // Ingestion
        .route("/webhook", post(webhook::ingest_webhook))
        // Reads
        .route("/messages", get(messages::get_messages))
        .route("/stats", get(stats::get_stats))
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                // Tracing layer (outermost - runs first)
                .layer(TraceLayer::new_for_http())
                // Permissive CORS for downstream reporting tools
                .layer(CorsLayer::permissive())
                // Request logging + per-request metrics
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .into_inner(),
        )
        .with_state(app_context)
}
