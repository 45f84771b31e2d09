//! Fixed-window text chunker with overlapping boundaries.
//!
//! Splits document body text into [`Chunk`]s of at most `chunk_size`
//! characters. Consecutive chunks from the same document share exactly
//! `chunk_overlap` characters so that retrieval context survives chunk
//! edges. Windows are measured in characters and never split a UTF-8
//! code point.
//!
//! Each chunk receives a UUID, a SHA-256 hash of its text, and a
//! contiguous `chunk_index` starting at 0.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Split text into overlapping fixed-size windows.
///
/// Returns an empty vector for empty or whitespace-only input; the caller
/// decides whether that is an error.
pub fn chunk_text(document_id: &str, text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    debug_assert!(overlap < chunk_size, "overlap must be smaller than window");

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    // Byte offsets of every char boundary, plus the end of the string.
    let mut boundaries: Vec<usize> = trimmed.char_indices().map(|(i, _)| i).collect();
    boundaries.push(trimmed.len());
    let total_chars = boundaries.len() - 1;

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut chunk_index: i64 = 0;

    loop {
        let end = (start + chunk_size).min(total_chars);
        let piece = &trimmed[boundaries[start]..boundaries[end]];
        chunks.push(make_chunk(document_id, chunk_index, piece));
        chunk_index += 1;

        if end == total_chars {
            break;
        }
        start += step;
    }

    chunks
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("doc1", "The sky is blue.", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "The sky is blue.");
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("doc1", "", 1000, 200).is_empty());
        assert!(chunk_text("doc1", "   \n\t ", 1000, 200).is_empty());
    }

    #[test]
    fn test_chunk_length_never_exceeds_window() {
        let text = "abcdefghij".repeat(50);
        let chunks = chunk_text("doc1", &text, 64, 16);
        for c in &chunks {
            assert!(c.text.chars().count() <= 64, "chunk too long: {}", c.text.len());
        }
    }

    #[test]
    fn test_adjacent_chunks_share_overlap() {
        let text: String = (0..400).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let overlap = 20;
        let chunks = chunk_text("doc1", &text, 100, overlap);
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            let tail: String = prev[prev.len() - overlap..].iter().collect();
            let head: String = next[..overlap].iter().collect();
            assert_eq!(tail, head, "adjacent chunks must share the overlap window");
        }
    }

    #[test]
    fn test_indices_contiguous() {
        let text = "word ".repeat(500);
        let chunks = chunk_text("doc1", &text, 120, 30);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
        }
    }

    #[test]
    fn test_multibyte_text_does_not_split_code_points() {
        let text = "héllo wörld ünïcode ".repeat(40);
        let chunks = chunk_text("doc1", &text, 50, 10);
        // Slicing off a char boundary would have panicked; also check bounds.
        for c in &chunks {
            assert!(c.text.chars().count() <= 50);
        }
    }

    #[test]
    fn test_deterministic_text_and_hash() {
        let text = "alpha beta gamma delta ".repeat(30);
        let a = chunk_text("doc1", &text, 80, 20);
        let b = chunk_text("doc1", &text, 80, 20);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.text, y.text);
            assert_eq!(x.hash, y.hash);
        }
    }
}
