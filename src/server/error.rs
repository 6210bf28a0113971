use axum::extract::multipart::MultipartError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::auth::SessionError;
use crate::flashcards::{FilenameParseError, FlashcardStorageError};
use crate::uploads::UploadError;

/// Error returned by request handlers, rendered as `{"detail": "..."}`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            Self::Internal(msg) => {
                log::error!("Request failed: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(serde_json::json!({ "detail": detail }));

        match self {
            Self::Unauthorized(_) => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

impl From<FlashcardStorageError> for ApiError {
    fn from(err: FlashcardStorageError) -> Self {
        match err {
            FlashcardStorageError::DeckNotFound(_) => Self::NotFound("Deck not found".to_string()),
            FlashcardStorageError::CardNotFound(_) => Self::NotFound("Card not found".to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(_) => Self::Internal(err.to_string()),
            UploadError::NotAnImage(_) | UploadError::InvalidFilename(_) => {
                Self::Validation(err.to_string())
            }
        }
    }
}

impl From<FilenameParseError> for ApiError {
    fn from(err: FilenameParseError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}
