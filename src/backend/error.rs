//! Error types for the backend client.

use thiserror::Error;

/// Errors returned by backend calls and session persistence.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Invalid backend URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The backend answered with a non-success status.
    #[error("backend returned status {0}")]
    Status(u16),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Response body was not the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl BackendError {
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
            Self::Timeout | Self::HttpRequest(_) => true,
            Self::Status(status) => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Convenience result alias for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(BackendError::Timeout.is_retryable());
        assert!(BackendError::Status(503).is_retryable());
        assert!(BackendError::Status(429).is_retryable());
        assert!(!BackendError::Status(404).is_retryable());
        assert!(!BackendError::MalformedResponse("rows".to_string()).is_retryable());
    }
}
