/// Error types for Story Service
///
/// Engine errors are mapped onto HTTP statuses here; every error body is
/// `{"error": .., "status": .., "retryable": ..}`.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;
use story_engine::StoryError;

/// Result type for story-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Backing store unreachable; the client may retry
    Unavailable(String),

    /// Validation failed
    ValidationError(String),

    /// Resource not found
    NotFound(String),

    /// Missing or malformed caller identity
    Unauthorized(String),

    /// Forbidden access
    Forbidden(String),

    /// Internal server error
    Internal(String),
}

impl AppError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Unavailable(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unavailable(msg) => write!(f, "{}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
            "retryable": self.is_retryable(),
        }))
    }
}

impl From<StoryError> for AppError {
    fn from(err: StoryError) -> Self {
        match err {
            StoryError::RecordStoreUnavailable(msg) => {
                tracing::warn!(error = %msg, "Story record store unavailable");
                AppError::Unavailable("story store unavailable".to_string())
            }
            StoryError::InvalidPayload(msg) => AppError::ValidationError(msg),
            StoryError::Forbidden(msg) => AppError::Forbidden(msg),
            StoryError::EmptyGroup(author_id) => {
                AppError::NotFound(format!("no stories for author {}", author_id))
            }
            other @ (StoryError::InvalidGroupReference(_) | StoryError::SessionClosed) => {
                AppError::Internal(other.to_string())
            }
        }
    }
}
