//! PDF extraction error types.

use thiserror::Error;

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Errors that can occur while extracting document text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// One parsing attempt failed.
    #[error("{0}")]
    Parse(String),

    /// The document parsed but produced no text.
    #[error("no text found in document")]
    Empty,

    /// Every strategy failed; carries the last failure.
    #[error("Impossible d'extraire le texte de ce PDF. Erreur: {0}")]
    AllAttemptsFailed(String),

    /// The blocking worker could not run.
    #[error("extraction task failed: {0}")]
    Task(String),
}

impl ExtractError {
    /// Whether the document itself is at fault, as opposed to the server.
    pub fn is_unprocessable(&self) -> bool {
        matches!(self, Self::AllAttemptsFailed(_))
    }
}
