use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type HotelResult<T> = Result<T, HotelError>;

/// Error taxonomy for the core. Every caller-facing error carries enough
/// structure to build a `{kind, retriable, userMessage}` response without
/// leaking internals.
#[derive(Error, Debug)]
pub enum HotelError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("pricing error: {0}")]
    Pricing(String),

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("queue full: {0}")]
    QueueFull(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error kind discriminant, exposed to callers without the message detail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Pricing,
    CacheUnavailable,
    ProviderUnavailable,
    Conflict,
    Unauthorized,
    QueueFull,
    Internal,
}

/// Caller-facing error payload. Technical detail stays in `tracing` logs;
/// `user_message` is the only thing surfaced to an end user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub retriable: bool,
    pub user_message: String,
}

impl HotelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HotelError::NotFound(_) => ErrorKind::NotFound,
            HotelError::Validation(_) => ErrorKind::Validation,
            HotelError::Pricing(_) => ErrorKind::Pricing,
            HotelError::CacheUnavailable(_) => ErrorKind::CacheUnavailable,
            HotelError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            HotelError::Conflict(_) => ErrorKind::Conflict,
            HotelError::Unauthorized(_) => ErrorKind::Unauthorized,
            HotelError::QueueFull(_) => ErrorKind::QueueFull,
            HotelError::Serialization(_) | HotelError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same operation (after a refreshed read) has a
    /// chance of succeeding.
    pub fn retriable(&self) -> bool {
        matches!(
            self,
            HotelError::Conflict(_) | HotelError::CacheUnavailable(_) | HotelError::ProviderUnavailable(_)
        )
    }

    /// Localized (English-only placeholder) message safe to show a user.
    pub fn user_message(&self) -> String {
        match self {
            HotelError::NotFound(what) => format!("{what} could not be found."),
            HotelError::Validation(_) => "The request could not be processed as sent.".to_string(),
            HotelError::Pricing(_) => "Pricing is temporarily unavailable for this room.".to_string(),
            HotelError::CacheUnavailable(_) => "Please try again in a moment.".to_string(),
            HotelError::ProviderUnavailable(_) => "A linked service is temporarily unavailable.".to_string(),
            HotelError::Conflict(_) => {
                "This booking changed while you were viewing it. Please retry.".to_string()
            }
            HotelError::Unauthorized(_) => "You do not have access to this resource.".to_string(),
            HotelError::QueueFull(_) => {
                "Too many updates right now; some notifications may be delayed.".to_string()
            }
            HotelError::Serialization(_) | HotelError::Internal(_) => {
                "Something went wrong on our end.".to_string()
            }
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.kind(),
            retriable: self.retriable(),
            user_message: self.user_message(),
        }
    }
}
