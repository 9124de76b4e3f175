//! Grader error types.

use thiserror::Error;

/// Errors from a remote grading service.
#[derive(Debug, Error)]
pub enum GraderError {
    /// The service returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The service returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl GraderError {
    /// Errors that will not go away by retrying the same request.
    pub fn is_permanent(&self) -> bool {
        match self {
            GraderError::AuthenticationFailed(_) => true,
            GraderError::ApiError { status, .. } => {
                (400..500).contains(status) && *status != 408
            }
            _ => false,
        }
    }

    /// Server-provided wait before the next attempt.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            GraderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(GraderError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(GraderError::ApiError {
            status: 422,
            message: String::new()
        }
        .is_permanent());
        assert!(!GraderError::ApiError {
            status: 503,
            message: String::new()
        }
        .is_permanent());
        assert!(!GraderError::Timeout(30).is_permanent());

        let limited = GraderError::RateLimited {
            retry_after_ms: 2000,
        };
        assert!(!limited.is_permanent());
        assert_eq!(limited.retry_after_ms(), Some(2000));
        assert_eq!(GraderError::NetworkError("reset".into()).retry_after_ms(), None);
    }
}
