//! Error taxonomy for the chat core.
//!
//! `InvalidInput` and `NotFound` surface at the orchestrator boundary so the
//! UI can show a distinct message. Failures inside the query pipeline's
//! generation step are converted to degraded answer strings instead of being
//! raised (see [`crate::pipeline`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("request timed out")]
    Timeout,

    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("no documents were produced from the file")]
    EmptyDocument,

    #[error("{0}")]
    Internal(String),
}

impl From<sqlx::Error> for ChatError {
    fn from(e: sqlx::Error) -> Self {
        ChatError::Internal(format!("database error: {e}"))
    }
}

impl From<std::io::Error> for ChatError {
    fn from(e: std::io::Error) -> Self {
        ChatError::Internal(format!("io error: {e}"))
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatError::Timeout
        } else {
            ChatError::Internal(format!("http error: {e}"))
        }
    }
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;
