//! Conversion of library errors into HTTP responses
//!
//! This is the only place status codes are chosen for failures. Internal
//! faults are logged with full detail and answered with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{Error, files::FileError, ledger::LedgerError};

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => message,
            ApiError::Internal => "Internal server error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::Ledger(LedgerError::UsernameAlreadyExists { .. }) => {
                ApiError::Conflict("Username already exists".to_string())
            }
            Error::Ledger(LedgerError::InvalidCredentials) => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            Error::Session(_) => ApiError::unauthorized(),
            Error::Files(FileError::NotFound { .. }) => {
                ApiError::NotFound("File not found".to_string())
            }
            Error::Files(FileError::TooLarge { .. } | FileError::InvalidName { .. })
            | Error::Files(FileError::UnsupportedPreview { .. }) => {
                ApiError::BadRequest(err.to_string())
            }
            _ if err.is_invalid_path() => ApiError::BadRequest(err.to_string()),
            _ => {
                tracing::error!("Internal error in {}: {err}", err.module());
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "message": self.message() }))).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
