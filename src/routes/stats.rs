// ============================================================================
// Stats Routes
// ============================================================================
//
// Endpoints:
// - GET /stats - Aggregate statistics over all stored messages
//
// ============================================================================

use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::context::AppContext;
use crate::db;
use crate::error::AppError;

/// GET /stats
pub async fn get_stats(
    State(app_context): State<Arc<AppContext>>,
) -> Result<impl IntoResponse, AppError> {
    let stats = db::stats(&app_context.db_pool).await?;
    Ok(Json(stats))
}
