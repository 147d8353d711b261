use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::error::ScoringError;

/// Errors that can occur when interacting with the Claude API
#[derive(Error, Debug)]
pub enum ClaudeApiError {
    /// Invalid request parameters (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing API key (HTTP 401)
    #[error("Invalid API key - authentication failed")]
    InvalidApiKey,

    /// No API key configured
    #[error("Anthropic API key not set. Set ANTHROPIC_API_KEY or configure scoring.api_key")]
    MissingApiKey,

    /// Forbidden - permission denied (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimitExceeded,

    /// Server error from Claude API (HTTP 5xx, 529)
    #[error("Server error ({0}): {1}")]
    ServerError(StatusCode, String),

    /// Network or connection error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Body is not a message envelope
    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    /// Unknown or unexpected error
    #[error("Unknown error ({0}): {1}")]
    UnknownError(StatusCode, String),
}

impl ClaudeApiError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            400 => Self::InvalidRequest(body),
            401 => Self::InvalidApiKey,
            403 => Self::Forbidden(body),
            404 => Self::NotFound,
            429 => Self::RateLimitExceeded,
            code if status.is_server_error() || code == 529 => Self::ServerError(status, body),
            _ => Self::UnknownError(status, body),
        }
    }

    /// Returns true if this error is transient (the oracle is unreachable
    /// or overloaded)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimitExceeded | Self::ServerError(_, _) => true,
            Self::NetworkError(e) => !e.is_builder(),
            _ => false,
        }
    }
}

impl From<ClaudeApiError> for ScoringError {
    fn from(err: ClaudeApiError) -> Self {
        if err.is_transient() {
            return Self::Transport(err.to_string());
        }

        match err {
            ClaudeApiError::InvalidResponse(reason) => Self::MalformedResponse(reason),
            other => Self::unknown("calling the scoring oracle", other),
        }
    }
}
