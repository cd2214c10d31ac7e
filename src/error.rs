use axum::{http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
///
/// Covers the failure classes of the ingestion and read paths, providing
/// structured error information for logging and user-facing responses.
/// Duplicate inserts and storage failures on the webhook path are NOT
/// errors at this level: the webhook handler acknowledges both (see
/// `routes::webhook`).
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Authentication Errors =====
    #[error("authentication error: {0}")]
    Auth(String),

    // ===== Validation Errors =====
    #[error("validation error: {0}")]
    Validation(String),

    // ===== Query Parameter Errors =====
    #[error("invalid query parameter: {0}")]
    Query(String),

    // ===== Database & Storage Errors =====
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    // ===== Unknown/Generic Errors =====
    #[error("unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) | AppError::Query(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message (without sensitive details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Auth(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Query(msg) => msg.clone(),
            AppError::Database(_) => "database error".to_string(),
            AppError::Unknown(_) => "internal server error".to_string(),
        }
    }

    /// Get error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Query(_) => "QUERY_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// Log this error with appropriate level and context
    pub fn log(&self) {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = %code,
                status = %status.as_u16(),
                "Server error occurred"
            );
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                error = %self,
                error_code = %code,
                "Authentication failed"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = %code,
                "Client error occurred"
            );
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        AppError::Auth(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create a query parameter error
    pub fn query(msg: impl Into<String>) -> Self {
        AppError::Query(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let error_code = self.error_code();

        // For server errors, don't expose internal details to the client
        let response_body = if status.is_server_error() {
            json!({
                "error": "internal server error",
                "error_code": error_code,
                "status": status.as_u16(),
            })
        } else {
            json!({
                "error": self.user_message(),
                "error_code": error_code,
                "status": status.as_u16(),
            })
        };

        (status, axum::Json(response_body)).into_response()
    }
}
