//! Sentence-aware document chunking.
//!
//! Large documents are split into chunks that each fit an upstream call.
//! Splits happen at sentence terminators so no sentence straddles a chunk;
//! a single sentence longer than the limit becomes its own oversized chunk.

use confab_common::{Error, Result};

/// Split `text` into chunks of at most `max_length` characters each.
///
/// Sentences are delimited by `.`, `!` and `?`. Terminators are consumed and
/// whitespace around sentences is trimmed. Returns [`Error::EmptyContent`]
/// when the text holds no sentences at all.
pub fn chunk_text(text: &str, max_length: usize) -> Result<Vec<String>> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Err(Error::EmptyContent);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        if current.is_empty() {
            current.push_str(sentence);
        } else if current.len() + 1 + sentence.len() > max_length {
            chunks.push(std::mem::take(&mut current));
            current.push_str(sentence);
        } else {
            current.push(' ');
            current.push_str(sentence);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}

fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}
