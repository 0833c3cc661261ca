//! Runtime client error types.

use thiserror::Error;

/// Result type for runtime operations.
pub type InferenceResult<T> = Result<T, InferenceError>;

/// Errors that can occur while talking to the LLM runtime.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Connection failed.
    #[error("Failed to connect to LLM runtime at {url}: {message}")]
    ConnectionFailed { url: String, message: String },

    /// Runtime answered with a non-success status.
    #[error("LLM runtime returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Runtime reported an error inside the stream.
    #[error("LLM runtime error: {0}")]
    Runtime(String),

    /// Reading the response body failed.
    #[error("Failed to read runtime stream: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a stream line.
    #[error("Failed to parse runtime response: {0}")]
    ParseError(String),
}
