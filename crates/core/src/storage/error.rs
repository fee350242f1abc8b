//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Base URL or credentials are missing.
    #[error("object storage is not configured: missing {0}")]
    NotConfigured(&'static str),

    /// The storage service answered with a non-success status.
    #[error("storage service rejected the request with status {status}: {body}")]
    Rejected {
        /// HTTP status returned by the service.
        status: u16,
        /// Response body returned by the service.
        body: String,
    },

    /// The request never produced a response.
    #[error("storage request failed: {0}")]
    Transport(String),

    /// A URL does not point into the configured bucket.
    #[error("not an object URL for this bucket: {0}")]
    InvalidUrl(String),
}

impl StorageError {
    /// Create a rejected error.
    #[must_use]
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl(url.into())
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
