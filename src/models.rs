//! Core data models shared by the ingestion, retrieval, and answering
//! pipeline.

use serde::{Deserialize, Serialize};

/// A file that was successfully extracted during `/process`.
///
/// Immutable once created; owned by the [`Session`](crate::session::Session)
/// until the next processing cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub raw_text: String,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_text: raw_text.into(),
        }
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_name(&self.name)
    }
}

/// Classification of an uploaded file by its lowercase suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
    Code,
    Unsupported,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") {
            FileKind::Pdf
        } else if lower.ends_with(".py") {
            FileKind::Code
        } else if lower.ends_with(".txt") || lower.ends_with(".md") {
            FileKind::Text
        } else {
            FileKind::Unsupported
        }
    }
}

/// How a processed file set is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// One file: a single shared index, no diff.
    Single,
    /// Two documents: one index per file plus a document diff summary.
    Documents,
    /// Two code files: a code diff summary, no embeddings.
    Code,
}

impl ComparisonMode {
    /// Choose the mode for a set of extracted files. `None` when the count
    /// is not 1 or 2.
    pub fn for_files(files: &[UploadedFile]) -> Option<Self> {
        match files {
            [_] => Some(ComparisonMode::Single),
            [a, b] if a.kind() == FileKind::Code && b.kind() == FileKind::Code => {
                Some(ComparisonMode::Code)
            }
            [_, _] => Some(ComparisonMode::Documents),
            _ => None,
        }
    }
}

/// A bounded window of a file's text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    /// Offset of the first character of `text` within the source, in chars.
    pub start: usize,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

impl Chunk {
    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
