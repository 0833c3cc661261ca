//! Client error types.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while talking to a lexchat server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-level failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Document extraction was refused by the server.
    #[error("PDF extraction failed ({status}): {error}")]
    Extraction {
        status: u16,
        error: String,
        details: Option<String>,
    },

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
