//! Source document loading.
//!
//! The résumé may be a PDF or a plain-text/markdown file. PDFs are reduced
//! to text with `pdf-extract`; page breaks (form feeds) become page
//! locators so retrieved chunks can cite where they came from.

use std::path::Path;

use crate::error::RetrievalError;

/// One page (or the whole document, for unpaged sources) of extracted text.
#[derive(Debug, Clone)]
pub struct DocumentPage {
    pub number: usize,
    pub text: String,
}

/// Extract the document's text, page by page.
///
/// Fails with `SourceMissing` when the document cannot be located — a fatal
/// configuration error at the build path, never retried.
pub fn load_document(path: &Path) -> Result<Vec<DocumentPage>, RetrievalError> {
    if !path.exists() {
        return Err(RetrievalError::SourceMissing(path.display().to_string()));
    }

    let raw = match path.extension().and_then(|e| e.to_str()) {
        Some("pdf") => pdf_extract::extract_text(path).map_err(|e| RetrievalError::Extraction {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?,
        _ => std::fs::read_to_string(path)?,
    };

    let pages: Vec<DocumentPage> = raw
        .split('\u{0c}')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(i, text)| DocumentPage {
            number: i + 1,
            text: text.to_string(),
        })
        .collect();

    if pages.is_empty() {
        return Err(RetrievalError::Extraction {
            path: path.display().to_string(),
            reason: "document contains no text".into(),
        });
    }

    Ok(pages)
}
