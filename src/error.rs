//! Error types for the membership server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::card::RenderError;
use crate::verification::SessionError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Card rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Unauthorized(format!(
            "{}. Invalid or expired verification token. Please verify again.",
            e
        ))
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Failed to read upload: {}", e))
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Render(e) => {
                tracing::error!("Render error: {}", e);
                match e {
                    RenderError::TemplateMissing(path) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "template_missing",
                        format!("Template not found at {}", path.display()),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "render_error",
                        "Failed to render membership card".to_string(),
                    ),
                }
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "IO error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
