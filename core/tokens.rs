//! Heuristic token estimation.
//!
//! The count is an approximation of how much room a file takes up in a
//! language-model context window. It is not tied to any real tokenizer.

use crate::error::{AppError, Result};
use std::fs;
use std::path::Path;

const COMMENT_MARKERS: [&str; 4] = ["//", "#", "/*", "*"];
const OPERATOR_CHARS: &[char] = &[
    '=', '+', '-', '*', '/', '%', '<', '>', '!', '&', '|', '^', '~',
];

/// Estimates the token count of raw file bytes, one line at a time.
///
/// Code-like lines count identifier runs and punctuation individually;
/// everything else is approximated as a quarter of its character length.
/// Invalid UTF-8 sequences are replaced before counting, so the result is
/// still a pure function of the input bytes.
pub fn estimate_tokens(content: &[u8]) -> usize {
    let text = String::from_utf8_lossy(content);
    text.lines().map(estimate_line).sum()
}

/// Reads a file and estimates its tokens.
pub fn count_file_tokens(path: &Path) -> Result<usize> {
    let bytes = fs::read(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(estimate_tokens(&bytes))
}

fn estimate_line(line: &str) -> usize {
    if line.trim().is_empty() {
        return 0;
    }
    if is_code_line(line) {
        count_code_tokens(line)
    } else {
        line.chars().count() / 4
    }
}

pub(crate) fn is_code_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if COMMENT_MARKERS
        .iter()
        .any(|marker| trimmed.starts_with(marker))
    {
        return false;
    }

    let has_braces = line.contains(['{', '}']);
    let has_parens = line.contains(['(', ')']);
    let has_operators = line.contains(OPERATOR_CHARS);
    has_braces || has_parens || has_operators
}

fn count_code_tokens(line: &str) -> usize {
    let mut tokens = 0;
    let mut in_word = false;

    for ch in line.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            if !in_word {
                tokens += 1;
                in_word = true;
            }
        } else {
            in_word = false;
            if !ch.is_whitespace() {
                tokens += 1;
            }
        }
    }
    tokens
}
