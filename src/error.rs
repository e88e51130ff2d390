//! HTTP error type.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::council::pipeline::RunError;
use crate::storage::StorageError;

/// Errors returned by API and UI handlers.
///
/// Rendered as `{"detail": "..."}` with a matching status code.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Unknown conversation or resource.
    #[error("{0}")]
    NotFound(String),

    /// Malformed or empty request.
    #[error("{0}")]
    BadRequest(String),

    /// Conversation storage failed.
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// The council run did not finish.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Status code the error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The conversation-not-found error.
    #[must_use]
    pub fn conversation_not_found() -> Self {
        Self::NotFound("Conversation not found".to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) | StorageError::InvalidId(_) => {
                Self::conversation_not_found()
            }
            other => Self::Storage(other),
        }
    }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Storage(e) => e.into(),
            aborted @ RunError::Aborted(_) => Self::Internal(aborted.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_not_found_maps_to_404() {
        let err = ApiError::from(StorageError::NotFound("c1".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Conversation not found");
    }

    #[test]
    fn test_io_maps_to_500() {
        let io = std::io::Error::other("disk full");
        let err = ApiError::from(StorageError::Io(io));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_bad_request() {
        let resp = ApiError::BadRequest("Message content is required".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_run_error_mapping() {
        let err = ApiError::from(RunError::Storage(StorageError::NotFound("c1".to_string())));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
