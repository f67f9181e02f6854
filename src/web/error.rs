use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::store::StoreError;
use crate::services::{MonitorServiceError, PingError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {msg}"),
            ),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MonitorGone => AppError::NotFound("Monitor not found".to_string()),
            StoreError::SlugTaken(slug) => AppError::Conflict(format!("slug already in use: {slug}")),
            StoreError::Unavailable(msg) => AppError::DatabaseError(msg),
        }
    }
}

impl From<MonitorServiceError> for AppError {
    fn from(err: MonitorServiceError) -> Self {
        match err {
            MonitorServiceError::Validation(msg) => AppError::InvalidInput(msg),
            MonitorServiceError::NotFound => AppError::NotFound("Monitor not found".to_string()),
            // The wire keeps the historical "Unauthorized" body for ownership
            // failures even though the status is 403.
            MonitorServiceError::NotOwner => AppError::Forbidden("Unauthorized".to_string()),
            MonitorServiceError::Store(e) => e.into(),
        }
    }
}

impl From<PingError> for AppError {
    fn from(err: PingError) -> Self {
        match err {
            PingError::UnknownSlug => AppError::NotFound("Monitor not found".to_string()),
            PingError::Contended => AppError::ServiceUnavailable(err.to_string()),
            PingError::Store(e) => e.into(),
        }
    }
}
