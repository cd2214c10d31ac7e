// ============================================================================
// Webhook Routes
// ============================================================================
//
// Endpoints:
// - POST /webhook - Ingest a signed provider notification
//
// ============================================================================

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;

use crate::context::AppContext;
use crate::db::{self, InsertOutcome};
use crate::error::AppError;
use crate::message::WebhookMessage;
use crate::metrics::WEBHOOK_REQUESTS_TOTAL;
use crate::signature::verify_signature;

/// POST /webhook
///
/// Authenticates the raw body against the `X-Signature` header, validates
/// the payload, and persists it idempotently. Duplicates are acknowledged
/// as success, and storage failures are downgraded to a soft success so the
/// provider does not enter a retry storm; both are surfaced via logs and
/// the `webhook_requests_total` counter instead.
pub async fn ingest_webhook(
    State(app_context): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let secret = &app_context.config.webhook_secret;

    let signature = headers
        .get("x-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if secret.is_empty() || !verify_signature(secret, &body, signature) {
        WEBHOOK_REQUESTS_TOTAL
            .with_label_values(&["invalid_signature"])
            .inc();
        return Err(AppError::auth("invalid signature"));
    }

    let message = match WebhookMessage::parse(&body) {
        Ok(message) => message,
        Err(e) => {
            WEBHOOK_REQUESTS_TOTAL
                .with_label_values(&["validation_error"])
                .inc();
            tracing::warn!(error = %e, "Webhook payload validation failed");
            return Err(AppError::validation("validation error"));
        }
    };

    match db::insert_message(&app_context.db_pool, &message).await {
        InsertOutcome::Created => {
            WEBHOOK_REQUESTS_TOTAL.with_label_values(&["created"]).inc();
            tracing::info!(
                message_id = %message.message_id,
                dup = false,
                result = "created",
                "Webhook message stored"
            );
        }
        InsertOutcome::Duplicate => {
            WEBHOOK_REQUESTS_TOTAL.with_label_values(&["duplicate"]).inc();
            tracing::info!(
                message_id = %message.message_id,
                dup = true,
                result = "duplicate",
                "Webhook message already stored"
            );
        }
        InsertOutcome::StorageError(detail) => {
            // Still acknowledged with 200: a non-success response would
            // trigger provider-side redelivery of a payload we cannot
            // store anyway.
            WEBHOOK_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
            tracing::error!(
                error = %detail,
                message_id = %message.message_id,
                "Failed to persist webhook message"
            );
        }
    }

    Ok((StatusCode::OK, Json(json!({"status": "ok"}))))
}
