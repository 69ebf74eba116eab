//! Error types for the AtomPub client.

use thiserror::Error;

/// Errors that can occur when talking to the blog's publishing endpoint.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP exchange itself failed (connection, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service rejected our credentials, or an operation that needs a
    /// session was called before `login`.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The response body was malformed or not the document we expected.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The caller-supplied entry is missing required fields.
    #[error("invalid entry: {0}")]
    Validation(String),

    /// The service signalled throttling (HTTP 429).
    #[error("rate limited{}", match retry_after_secs {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    })]
    RateLimited {
        /// Seconds to wait before retrying (from Retry-After header, optional).
        retry_after_secs: Option<u64>,
    },
}

impl Error {
    /// The server's Retry-After hint, if this is a rate-limit failure.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Error::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }
}

impl From<crate::xml::XmlError> for Error {
    fn from(err: crate::xml::XmlError) -> Self {
        Error::Protocol(err.to_string())
    }
}
