//! PDF text extraction with progressively more permissive fallbacks.
//!
//! Extraction is CPU-bound and the underlying parsers may panic on
//! malformed input, so every attempt runs on the blocking pool and a
//! panicking attempt counts as a failed one.

mod error;
mod extractor;

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

pub use error::{ExtractError, ExtractResult};
pub use extractor::PdfTextExtractor;

/// Text returned by a successful extraction attempt.
pub const PARTIAL_CONTENT: &str = "Contenu partiellement extrait";

/// Extracted document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// Page count, never zero.
    pub pages: u32,
}

/// Parsing strategies, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Layout-aware extraction of the whole document.
    Standard,
    /// Plain content-stream extraction of all pages at once.
    Lenient,
    /// Page-by-page extraction that skips pages which fail to decode.
    PageByPage,
}

impl Strategy {
    pub const ORDER: [Strategy; 3] = [Strategy::Standard, Strategy::Lenient, Strategy::PageByPage];
}

/// A document text extractor.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, data: &[u8], strategy: Strategy) -> ExtractResult<ExtractedText>;
}

/// Try every [`Strategy`] in order and return the first success.
pub async fn extract_with_fallback(
    extractor: Arc<dyn TextExtractor>,
    data: Bytes,
) -> ExtractResult<ExtractedText> {
    let mut last_error = None;

    for strategy in Strategy::ORDER {
        let worker = extractor.clone();
        let input = data.clone();
        let attempt =
            tokio::task::spawn_blocking(move || worker.extract(&input, strategy)).await;

        let err = match attempt {
            Ok(Ok(extracted)) => {
                debug!(?strategy, pages = extracted.pages, "PDF extracted");
                return Ok(extracted);
            }
            Ok(Err(e)) => e,
            Err(join_err) if join_err.is_panic() => {
                ExtractError::Parse("parser panicked on malformed document".to_string())
            }
            Err(join_err) => return Err(ExtractError::Task(join_err.to_string())),
        };

        warn!(?strategy, "PDF extraction attempt failed: {}", err);
        last_error = Some(err);
    }

    let detail = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no extraction strategy available".to_string());
    Err(ExtractError::AllAttemptsFailed(detail))
}
