use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use rbin_core::error::RecycleError;
use rbin_core::store::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`RecycleError`] for domain errors and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses with stable `code` strings the dashboard can branch on.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `rbin_core`.
    #[error(transparent)]
    Recycle(#[from] RecycleError),

    /// A raw row store error from direct store access in a handler.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Recycle(err) => classify_recycle_error(err),
            AppError::Store(err) => classify_store_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a domain error to an HTTP status, error code, and message.
///
/// `InconsistentState` gets its own code (and an error-level log carrying
/// both ids) so operators can alert on it separately from ordinary,
/// retryable failures.
fn classify_recycle_error(err: &RecycleError) -> (StatusCode, &'static str, String) {
    match err {
        RecycleError::UnknownEntityType(t) => (
            StatusCode::BAD_REQUEST,
            "UNKNOWN_ENTITY_TYPE",
            format!("Unknown entity type: {t}"),
        ),
        RecycleError::EmptyPayload => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            err.to_string(),
        ),
        RecycleError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        RecycleError::ArchiveWriteFailed(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ARCHIVE_WRITE_FAILED",
            "Could not archive the row; nothing was deleted".to_string(),
        ),
        RecycleError::DeletionFailed(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "DELETION_FAILED",
            "Delete failed; the archived copy was rolled back".to_string(),
        ),
        RecycleError::InconsistentState {
            archive_id,
            entity_type,
            entity_id,
            ..
        } => {
            tracing::error!(
                %archive_id,
                entity_type,
                entity_id,
                "inconsistent state requires operator reconciliation"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INCONSISTENT_STATE",
                format!("Orphaned archive record {archive_id}; manual reconciliation required"),
            )
        }
        RecycleError::RestoreFailed(source) => match source {
            StoreError::Conflict { .. } => (
                StatusCode::CONFLICT,
                "CONFLICT",
                "Restore conflicts with an existing row".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "RESTORE_FAILED",
                "Restore failed; the archive record was kept".to_string(),
            ),
        },
        RecycleError::Store(source) => classify_store_error(source),
    }
}

fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::NotFound { .. } => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found".to_string())
        }
        StoreError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT", err.to_string()),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "Row store backend error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
