/*!
 * Line-boundary chunking of normalized text.
 */

use log::debug;
use serde::Serialize;

/// Separator between consecutive chunks; joining chunk texts with it
/// reproduces the input exactly
pub const CHUNK_SEPARATOR: &str = "\n";

// @struct: Ordered slice of normalized text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    // @field: 0-based position, contiguous across the sequence
    pub index: usize,

    // @field: Chunk text without the trailing separator
    pub text: String,

    // @field: Length in characters
    pub char_len: usize,

    // @field: A single line longer than the limit
    pub oversized: bool,
}

/// Split text into chunks of at most `max_chunk_chars` characters
///
/// Lines are accumulated greedily; a line that alone exceeds the limit is
/// emitted as its own chunk and flagged oversized. Empty text yields no chunks.
pub fn chunk(text: &str, max_chunk_chars: usize) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let total_chars = text.chars().count();
    if total_chars <= max_chunk_chars {
        return vec![Chunk {
            index: 0,
            text: text.to_string(),
            char_len: total_chars,
            oversized: false,
        }];
    }

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for line in text.split(CHUNK_SEPARATOR) {
        let line_len = line.chars().count();

        if !current.is_empty() && current_len + 1 + line_len > max_chunk_chars {
            flush(&mut current, &mut current_len, &mut chunks, max_chunk_chars);
        }

        if current.is_empty() {
            current_len = line_len;
        } else {
            current_len += 1 + line_len;
        }
        current.push(line);

        if line_len > max_chunk_chars {
            debug!("Line of {} chars exceeds the chunk limit of {}, placing it in its own chunk",
                   line_len, max_chunk_chars);
            flush(&mut current, &mut current_len, &mut chunks, max_chunk_chars);
        }
    }

    // A trailing separator leaves one empty line that must survive the round trip
    if !current.is_empty() {
        flush(&mut current, &mut current_len, &mut chunks, max_chunk_chars);
    }

    debug!("Split {} chars into {} chunks (max {})", total_chars, chunks.len(), max_chunk_chars);
    chunks
}

fn flush(lines: &mut Vec<&str>, len: &mut usize, chunks: &mut Vec<Chunk>, max_chunk_chars: usize) {
    chunks.push(Chunk {
        index: chunks.len(),
        text: lines.join(CHUNK_SEPARATOR),
        char_len: *len,
        oversized: *len > max_chunk_chars,
    });
    lines.clear();
    *len = 0;
}

/// Inverse of `chunk`
pub fn join_chunks(chunks: &[Chunk]) -> String {
    chunks.iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}
