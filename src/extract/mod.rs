
use lopdf::Document;
use std::path::Path;
use tracing::debug;

use crate::{RagError, Result};

/// Extract the text of every page of a PDF file, in page order.
///
/// Page texts are joined with newlines and the result is trimmed. Returns
/// [`RagError::Extraction`] when the document or any page fails to parse
/// and [`RagError::EmptyDocument`] when no text could be extracted.
#[inline]
pub fn extract_pdf_text(path: &Path) -> Result<String> {
    let doc = Document::load(path)
        .map_err(|e| RagError::Extraction(format!("failed to parse {}: {e}", path.display())))?;

    extract_document_text(&doc)
}

/// Extract text from an in-memory PDF. Same semantics as
/// [`extract_pdf_text`].
#[inline]
pub fn extract_pdf_text_from_bytes(bytes: &[u8]) -> Result<String> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| RagError::Extraction(format!("failed to parse document: {e}")))?;

    extract_document_text(&doc)
}

fn extract_document_text(doc: &Document) -> Result<String> {
    let pages = doc.get_pages();
    debug!("Extracting text from {} pages", pages.len());

    let mut raw_text = String::new();
    for page_number in pages.keys() {
        let page_text = doc
            .extract_text(&[*page_number])
            .map_err(|e| RagError::Extraction(format!("page {page_number}: {e}")))?;
        raw_text.push_str(&page_text);
        raw_text.push('\n');
    }

    let trimmed = raw_text.trim();
    if trimmed.is_empty() {
        return Err(RagError::EmptyDocument);
    }

    Ok(trimmed.to_string())
}
