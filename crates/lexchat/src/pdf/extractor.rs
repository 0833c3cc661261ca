//! [`TextExtractor`] backed by `pdf-extract` and `lopdf`.

use lopdf::Document;
use tracing::debug;

use super::error::{ExtractError, ExtractResult};
use super::{ExtractedText, PARTIAL_CONTENT, Strategy, TextExtractor};

/// Default extractor used by the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    fn standard(data: &[u8]) -> ExtractResult<ExtractedText> {
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| ExtractError::Parse(format!("{e:?}")))?;
        let text = non_empty(text)?;
        // Page count is informative only; fall back to one page.
        let pages = Document::load_mem(data)
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(1);
        Ok(ExtractedText {
            text,
            pages: pages.max(1),
        })
    }

    fn lenient(data: &[u8]) -> ExtractResult<ExtractedText> {
        let doc = load(data)?;
        let numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let text = doc
            .extract_text(&numbers)
            .map_err(|e| ExtractError::Parse(e.to_string()))?;
        Ok(ExtractedText {
            text: non_empty(text)?,
            pages: (numbers.len() as u32).max(1),
        })
    }

    fn page_by_page(data: &[u8]) -> ExtractResult<ExtractedText> {
        let doc = load(data)?;
        let numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let mut text = String::new();
        for number in &numbers {
            match doc.extract_text(&[*number]) {
                Ok(page) => {
                    text.push_str(page.trim_end());
                    text.push('\n');
                }
                Err(e) => debug!(page = number, "Skipping undecodable page: {}", e),
            }
        }

        let text = match text.trim() {
            "" => PARTIAL_CONTENT.to_string(),
            trimmed => trimmed.to_string(),
        };
        Ok(ExtractedText {
            text,
            pages: (numbers.len() as u32).max(1),
        })
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, data: &[u8], strategy: Strategy) -> ExtractResult<ExtractedText> {
        match strategy {
            Strategy::Standard => Self::standard(data),
            Strategy::Lenient => Self::lenient(data),
            Strategy::PageByPage => Self::page_by_page(data),
        }
    }
}

fn load(data: &[u8]) -> ExtractResult<Document> {
    Document::load_mem(data).map_err(|e| ExtractError::Parse(e.to_string()))
}

fn non_empty(text: String) -> ExtractResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ExtractError::Empty)
    } else {
        Ok(trimmed.to_string())
    }
}
