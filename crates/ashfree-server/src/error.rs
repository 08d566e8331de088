use ashfree_core::{CoachError, ExtractionError};
use ashfree_memory::MemoryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Everything a handler can fail with, mapped onto an HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Coach(#[from] CoachError),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Coach(CoachError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Self::Coach(CoachError::Memory(err)) | Self::Memory(err) => memory_status(err),
            Self::Coach(CoachError::Extraction(err)) => match err {
                ExtractionError::Pdf(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Coach(CoachError::Task(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn memory_status(err: &MemoryError) -> StatusCode {
    match err {
        MemoryError::InvalidUserId(_) => StatusCode::BAD_REQUEST,
        MemoryError::AlreadyExists(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
