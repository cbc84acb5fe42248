//! Error types for search and provider operations.

use thiserror::Error;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors from query planning and provider search.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    RequestFailed {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(&'static str),
}

impl SourceError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }
}
