use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application error type that converts to HTTP responses. Variant names
/// track the error kinds in spec §7 rather than any one source crate.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Gone(String),
    PayloadTooLarge(String),
    Unauthorized,
    Forbidden(String),
    Conflict(String),
    Internal(String),
    Database(sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Gone(msg) => (StatusCode::GONE, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required".into()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<dex_image::ImageError> for AppError {
    fn from(e: dex_image::ImageError) -> Self {
        match e {
            dex_image::ImageError::TooLarge(_) => AppError::PayloadTooLarge(e.to_string()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<dex_taxonomy::TaxonomyError> for AppError {
    fn from(e: dex_taxonomy::TaxonomyError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<dex_graph::GraphError> for AppError {
    fn from(e: dex_graph::GraphError) -> Self {
        match e {
            dex_graph::GraphError::PermissionDenied => AppError::Forbidden("administrator access required".to_string()),
            dex_graph::GraphError::Database(err) => AppError::Database(err),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}
