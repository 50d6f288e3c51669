//! Error types for the generation services.

use thiserror::Error;

/// Errors returned by text and image generation calls.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The service answered with a non-success status.
    #[error("service returned status {0}")]
    Status(u16),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Access denied, usually a bad API key.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Response body was not the expected shape or had no content.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// API key required but not configured.
    #[error("API key required for {0}")]
    ApiKeyRequired(String),
}

impl LlmError {
    /// Classify a transport error, separating timeouts.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::HttpRequest(err)
        }
    }

    /// Check if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::RateLimited | Self::HttpRequest(_) => true,
            Self::Status(status) => *status >= 500,
            _ => false,
        }
    }
}

/// Convenience result alias for generation calls.
pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::Timeout.is_retryable());
        assert!(LlmError::RateLimited.is_retryable());
        assert!(LlmError::Status(503).is_retryable());
        assert!(!LlmError::Status(400).is_retryable());
        assert!(!LlmError::ApiKeyRequired("OpenAI".to_string()).is_retryable());
        assert!(!LlmError::MalformedResponse("empty".to_string()).is_retryable());
    }
}
