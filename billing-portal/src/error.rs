//! The single error contract shared by every portal handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing form input; no query ran.
    Validation,
    /// A referenced row does not exist.
    NotFound,
    /// The database failed; the transaction was rolled back.
    Database,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Database => "database",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Database => StatusCode::BAD_REQUEST,
        }
    }
}

/// Client-facing failure, rendered as `{"kind": ..., "message": ...}`.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct PortalError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Database,
            message: message.into(),
        }
    }

    /// Translate a service error for the client.
    ///
    /// Not-found and validation messages pass through. Anything else is logged
    /// with its cause and replaced by `public_message`.
    pub fn from_app_error(err: AppError, public_message: &str) -> Self {
        match err {
            AppError::ValidationError(e) => Self::validation(e.to_string()),
            AppError::BadRequest(e) => Self::validation(e.to_string()),
            AppError::NotFound(e) => Self::not_found(e.to_string()),
            other => {
                tracing::error!(error = %other, kind = other.kind(), "Request failed");
                Self::database(public_message)
            }
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        (self.kind.status(), Json(self)).into_response()
    }
}
