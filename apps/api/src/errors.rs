#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::archive::manager::ArchiveError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            // Precondition failures: the conditional update matched no row.
            AppError::Archive(err @ ArchiveError::NotFoundOrAlreadyArchived(_)) => (
                StatusCode::CONFLICT,
                "NOT_FOUND_OR_ALREADY_ARCHIVED",
                err.to_string(),
            ),
            AppError::Archive(err @ ArchiveError::NotFoundOrNotArchived(_)) => (
                StatusCode::CONFLICT,
                "NOT_FOUND_OR_NOT_ARCHIVED",
                err.to_string(),
            ),
            AppError::Archive(err @ ArchiveError::MissingScope { .. }) => {
                (StatusCode::BAD_REQUEST, "MISSING_SCOPE", err.to_string())
            }
            AppError::Archive(ArchiveError::Store(e)) => {
                tracing::error!("Archive store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
