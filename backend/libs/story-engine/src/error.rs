//! Error types for the story engine

use thiserror::Error;
use uuid::Uuid;

/// Result type for story engine operations
pub type Result<T> = std::result::Result<T, StoryError>;

/// Errors raised by the grouping, playback and viewing components
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoryError {
    /// The story record store could not be reached or rejected the call
    #[error("Story record store unavailable: {0}")]
    RecordStoreUnavailable(String),

    /// Navigation requested without an active group
    #[error("Invalid group reference: {0}")]
    InvalidGroupReference(String),

    /// Open requested on a group with no items
    #[error("Story group for author {0} has no items")]
    EmptyGroup(Uuid),

    /// Requester is not allowed to see the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Story payload failed validation
    #[error("Invalid story payload: {0}")]
    InvalidPayload(String),

    /// The playback session task has shut down
    #[error("Playback session closed")]
    SessionClosed,
}

impl StoryError {
    /// Caller contract violations. These indicate a bug in the UI shell rather
    /// than a runtime condition.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            StoryError::InvalidGroupReference(_) | StoryError::EmptyGroup(_)
        )
    }

    /// Check if the error is transient (the caller may retry)
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoryError::RecordStoreUnavailable(_))
    }
}

impl From<sqlx::Error> for StoryError {
    fn from(err: sqlx::Error) -> Self {
        StoryError::RecordStoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoryError {
    fn from(err: serde_json::Error) -> Self {
        StoryError::InvalidPayload(err.to_string())
    }
}
