//! Plain-text extraction for uploaded files.
//!
//! Dispatches on the lowercase file suffix: `.pdf` is parsed page by page,
//! `.txt`, `.md` and `.py` are decoded as text. Anything else is
//! unsupported. Extraction never panics and never propagates; callers that
//! only care about success use [`extract_upload`], which maps every failure
//! to `None` and logs it.

use std::io::Read;

use thiserror::Error;

use crate::models::FileKind;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("failed to read upload: {0}")]
    Read(#[from] std::io::Error),
}

/// Extract plain text from the bytes of a file named `name`.
pub fn extract_text(name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    match FileKind::from_name(name) {
        FileKind::Pdf => extract_pdf(bytes),
        FileKind::Text | FileKind::Code => Ok(decode_text(bytes)),
        FileKind::Unsupported => Err(ExtractError::Unsupported(name.to_string())),
    }
}

/// Read the whole stream, then extract. Read failures are reported as
/// [`ExtractError::Read`].
pub fn extract_reader<R: Read>(name: &str, mut reader: R) -> Result<String, ExtractError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    extract_text(name, &bytes)
}

/// Extract text, or `None` when the file is unsupported or unreadable.
pub fn extract_upload(name: &str, bytes: &[u8]) -> Option<String> {
    match extract_text(name, bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(file = name, error = %e, "skipping upload");
            None
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.concat())
}

/// UTF-8 first; on failure, fall back to a single-byte decoding so that no
/// upload is rejected for its encoding.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
