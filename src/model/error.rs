use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The standard result type used throughout the application.
pub type StdResult<T> = Result<T, anyhow::Error>;

/// Fetcher error
#[derive(Error, Debug)]
pub enum FetcherError {
    /// Malformed repository identifier
    #[error("invalid repository: {0}, should be in the owner/repo format")]
    InvalidRepository(String),

    /// Primary rate limit hit, requests are rejected until the reset time
    #[error("rate limit exceeded until {reset_at}")]
    RateLimited {
        /// When the quota is restored.
        reset_at: DateTime<Utc>,
    },

    /// Secondary (abuse) rate limit hit
    #[error("secondary rate limit hit, retry after {retry_after:?}")]
    SecondaryRateLimited {
        /// How long to wait before retrying.
        retry_after: Duration,
    },

    /// Rate limit backoff would exceed the configured cap
    #[error("rate limit backoff exceeded, already waited {waited:?}")]
    RateLimitExceeded {
        /// Backoff already spent before giving up.
        waited: Duration,
    },

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Access denied
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Network or server side error
    #[error("transport error: {0}")]
    Transport(String),

    /// Parse error
    #[error("parsing error: {0}")]
    Parse(String),

    /// The request was aborted by shutdown
    #[error("request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for FetcherError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            FetcherError::Parse(error.to_string())
        } else {
            FetcherError::Transport(error.to_string())
        }
    }
}
