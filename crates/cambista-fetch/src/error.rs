//! Collector errors.

use thiserror::Error;

/// Errors raised while talking to the marketplace.
#[derive(Error, Debug)]
pub enum CollectError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("Server returned {status} for page {page}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Page that was requested.
        page: u32,
    },

    /// Response body was not the expected JSON document.
    #[error("Malformed response for page {page}: {message}")]
    Malformed {
        /// Page that was requested.
        page: u32,
        /// Decoder message.
        message: String,
    },
}

impl CollectError {
    /// Returns true for transport-level failures (timeouts, refused
    /// connections).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout() || e.is_connect() || e.is_request())
    }
}
