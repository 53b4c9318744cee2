//! Errors returned by platform calls.

use thiserror::Error;

use crate::types::ChatId;

/// Error type for [`Bot`](crate::Bot) calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The bot is not connected to the platform.
    #[error("bot is not connected")]
    NotConnected,
    /// The chat does not exist or the bot is not a member.
    #[error("chat not found: {0}")]
    ChatNotFound(ChatId),
    /// The bot may not contact this chat (e.g. the user never started a PM).
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The edit would not change the message.
    #[error("message is not modified")]
    NotModified,
    /// The platform rejected the request.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The call timed out.
    #[error("API call timed out")]
    Timeout,
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Result type for platform calls.
pub type ApiResult<T> = Result<T, ApiError>;
