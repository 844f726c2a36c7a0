//! Minimal text analysis shared by highlighting and the in-memory index.
//!
//! Tokens are maximal runs of alphanumeric characters, compared
//! case-insensitively. This is intentionally simple; real indexes bring their
//! own analyzers.

use std::collections::BTreeSet;

/// A token with its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lowercased token text.
    pub term: String,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match (c.is_alphanumeric(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                tokens.push(token(text, s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(token(text, s, text.len()));
    }
    tokens
}

fn token(text: &str, start: usize, end: usize) -> Token {
    Token {
        term: text[start..end].to_lowercase(),
        start,
        end,
    }
}

/// Distinct lowercase terms of a text.
pub fn terms(text: &str) -> BTreeSet<String> {
    tokenize(text).into_iter().map(|t| t.term).collect()
}

/// Truncate to at most `max_chars` characters, on a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
