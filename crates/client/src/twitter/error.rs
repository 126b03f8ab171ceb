//! Recent-search client error types.

use std::sync::Arc;

/// Errors from the recent-search API client.
#[derive(Debug, thiserror::Error)]
pub enum TwitterError {
    /// Missing bearer token.
    #[error("missing bearer token: BEARER_TOKEN not set")]
    MissingToken,

    /// Invalid search query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid max_results parameter (must be 10-100).
    #[error("invalid max_results: must be 10-100")]
    InvalidMaxResults,

    /// Authentication failed (invalid or revoked token).
    #[error("authentication failed: bearer token rejected")]
    AuthError,

    /// Rate limited by the API.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// The API answered 200 with errors and no data.
    #[error("API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for TwitterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { TwitterError::Timeout } else { TwitterError::Network(Arc::new(err)) }
    }
}

impl From<TwitterError> for pulse_core::Error {
    fn from(err: TwitterError) -> Self {
        match err {
            TwitterError::Timeout => pulse_core::Error::UpstreamTimeout(err.to_string()),
            TwitterError::InvalidQuery(msg) => pulse_core::Error::InvalidInput(msg),
            _ => pulse_core::Error::UpstreamUnavailable(err.to_string()),
        }
    }
}
