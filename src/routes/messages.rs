// ============================================================================
// Messages Routes
// ============================================================================
//
// Endpoints:
// - GET /messages - Filtered, paginated message listing
//
// ============================================================================

use axum::{Json, extract::Query, extract::State, response::IntoResponse};
use serde::Deserialize;
use std::sync::Arc;

use crate::context::AppContext;
use crate::db::{self, MessageFilter};
use crate::error::AppError;
use crate::message::MessagesResponse;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    limit: Option<i64>,
    offset: Option<i64>,
    #[serde(rename = "from")]
    from: Option<String>,
    since: Option<String>,
    q: Option<String>,
}

/// GET /messages
///
/// Rows are ordered `(ts, message_id)` ascending; `total` counts all rows
/// matching the filters regardless of pagination.
pub async fn get_messages(
    State(app_context): State<Arc<AppContext>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::query(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }

    let offset = params.offset.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::query("offset must be >= 0"));
    }

    let filter = MessageFilter {
        from: params.from,
        since: params.since,
        q: params.q,
    };

    let (data, total) = db::list_messages(&app_context.db_pool, &filter, limit, offset).await?;

    Ok(Json(MessagesResponse {
        data,
        total,
        limit,
        offset,
    }))
}
