//! API client error types

use thiserror::Error;

/// Errors that can occur while talking to the Locus server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server responded {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no task available")]
    NoTaskAvailable,
}

impl ApiError {
    /// True for any failure that should simply be logged and treated as an
    /// empty dispatch / soft-failed update rather than a fatal error.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ApiError::NoTaskAvailable)
    }
}
