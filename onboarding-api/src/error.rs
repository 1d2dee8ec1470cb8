//! API error types

use thiserror::Error;

/// Errors from the onboarding endpoints
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("request rejected"))]
    Rejected { status: u16, message: Option<String> },

    #[error("Timeout")]
    Timeout,

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Message embedded in the remote failure body, if the remote sent one
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => message.as_deref().filter(|m| !m.is_empty()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}
