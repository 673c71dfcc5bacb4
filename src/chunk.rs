//! Overlapping fixed-window text chunker.
//!
//! Splits text into [`Chunk`]s of at most `max_chars` characters, each one
//! starting `overlap_chars` characters before the end of its predecessor so
//! that context spanning a boundary stays retrievable.
//!
//! Splitting is length-based. A window end is pulled back to the last
//! whitespace inside the window when one exists past the overlap region,
//! which avoids cutting words in half; sentence boundaries are not
//! considered.
//!
//! # Guarantees
//!
//! - At least one chunk is returned (a single empty chunk for empty text).
//! - Chunk indices are contiguous: `0, 1, 2, …, N-1`.
//! - Consecutive chunks overlap, so their union covers the input with no
//!   gaps.

use sha2::{Digest, Sha256};

use crate::config::ChunkingConfig;
use crate::models::Chunk;

/// Chunk `text` using the configured window and overlap.
pub fn chunk_with(config: &ChunkingConfig, text: &str) -> Vec<Chunk> {
    chunk_text(text, config.max_chars, config.overlap_chars)
}

/// Split text into overlapping windows of at most `max_chars` characters.
///
/// `overlap_chars` is clamped below `max_chars` so the window always
/// advances.
pub fn chunk_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    let overlap = overlap_chars.min(max_chars - 1);

    // Byte offset of every char, plus the end of the string.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = offsets.len() - 1;

    if total == 0 {
        return vec![make_chunk(0, 0, text)];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + max_chars).min(total);
        let end = if hard_end == total {
            total
        } else {
            // Last whitespace past the overlap region, so the next window
            // still starts after this one.
            let floor = start + overlap + 1;
            (floor..hard_end)
                .rev()
                .find(|&i| chars[i].is_whitespace())
                .map(|i| i + 1)
                .unwrap_or(hard_end)
        };

        let piece = &text[offsets[start]..offsets[end]];
        chunks.push(make_chunk(chunks.len(), start, piece));

        if end == total {
            break;
        }
        start = end - overlap;
    }

    chunks
}

fn make_chunk(index: usize, start: usize, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        index,
        start,
        text: text.to_string(),
        hash,
    }
}
