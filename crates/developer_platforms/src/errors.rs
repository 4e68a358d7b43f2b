use std::time::Duration;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Error types for developer platform operations.
///
/// This enum represents all possible errors that can occur when talking to
/// GitHub or a GitHub Enterprise Server instance. Each variant provides
/// specific context about the type of failure encountered.
///
/// # Examples
///
/// ```rust
/// use pkup_developer_platforms::errors::Error;
///
/// let rate_limit = Error::RateLimitExceeded { retry_after: None };
/// assert_eq!(rate_limit.to_string(), "Rate limit exceeded");
/// assert!(rate_limit.is_rate_limited());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The platform answered with a non-success status code.
    ///
    /// The message is taken from the `message` field of the GitHub error
    /// document when one is present.
    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    /// The response body could not be decoded into the expected shape.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// The configured API address could not be turned into a request URL.
    #[error("Invalid API address: {0}")]
    InvalidUrl(String),

    /// Platform rate limit exceeded.
    ///
    /// GitHub reports both primary rate limits and abuse detection through
    /// `403 Forbidden` (and occasionally `429 Too Many Requests`). When the
    /// response carried a `Retry-After` or `X-RateLimit-Reset` header the
    /// computed wait is stored in `retry_after`.
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<Duration> },

    /// A listing or lookup failed for a specific organization or repository.
    #[error("Failed to {operation} for '{target}': {source}")]
    RepositoryOperation {
        operation: String,
        target: String,
        source: Box<Error>,
    },

    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Wraps the error with the operation and `org` or `org/repo` it belongs to.
    pub fn for_target(self, operation: &str, target: impl Into<String>) -> Self {
        Error::RepositoryOperation {
            operation: operation.to_string(),
            target: target.into(),
            source: Box::new(self),
        }
    }

    /// Returns `true` when the error, or the error it wraps, is a rate-limit response.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Error::RateLimitExceeded { .. } => true,
            Error::RepositoryOperation { source, .. } => source.is_rate_limited(),
            _ => false,
        }
    }

    /// Returns `true` for `409 Conflict`, which GitHub uses for empty repositories.
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::ApiError { status, .. } => *status == 409,
            Error::RepositoryOperation { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    /// The wait requested by the platform before the next attempt, if it sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimitExceeded { retry_after } => *retry_after,
            Error::RepositoryOperation { source, .. } => source.retry_after(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::InvalidResponse(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}
