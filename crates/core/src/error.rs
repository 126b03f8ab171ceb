//! Unified error types for pulse.
//!
//! The display prefix of every variant is its machine-readable code, which
//! the HTTP layer reuses in error bodies.

use tokio_rusqlite::rusqlite;

/// Unified error types for the pulse service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty query).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Search API transport, auth, rate-limit or parse failure.
    #[error("UPSTREAM_UNAVAILABLE: {0}")]
    UpstreamUnavailable(String),

    /// Search API did not answer within the configured timeout.
    #[error("UPSTREAM_TIMEOUT: {0}")]
    UpstreamTimeout(String),

    /// Fast cache could not be reached.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),

    /// Durable store operation failed.
    #[error("STORE_UNAVAILABLE: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_UNAVAILABLE: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored snapshot could not be decoded.
    #[error("MALFORMED_RECORD: {0}")]
    MalformedRecord(String),
}

impl Error {
    /// Machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            Error::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            Error::StoreUnavailable(_) | Error::Database(_) | Error::MigrationFailed(_) => "STORE_UNAVAILABLE",
            Error::MalformedRecord(_) => "MALFORMED_RECORD",
        }
    }

    /// An equivalent error with the same code and message.
    ///
    /// Database errors cannot be cloned and come back as `StoreUnavailable`.
    pub fn duplicate(&self) -> Self {
        match self {
            Error::InvalidInput(msg) => Error::InvalidInput(msg.clone()),
            Error::UpstreamUnavailable(msg) => Error::UpstreamUnavailable(msg.clone()),
            Error::UpstreamTimeout(msg) => Error::UpstreamTimeout(msg.clone()),
            Error::StoreUnavailable(msg) => Error::StoreUnavailable(msg.clone()),
            Error::Database(err) => Error::StoreUnavailable(err.to_string()),
            Error::MigrationFailed(msg) => Error::MigrationFailed(msg.clone()),
            Error::MalformedRecord(msg) => Error::MalformedRecord(msg.clone()),
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
