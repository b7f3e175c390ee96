//! Tokenizer (C5): lexing with line/column tracking and comment stripping.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Declaration,
    MagicVar,
    Keyword,
    Identifier,
    Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub line: usize,
    pub column: usize,
    pub kind: TokenKind,
}

const KEYWORDS: &[&str] = &["begin", "end", "theory", "verb", "session"];

/// Lex `source` into a flat token stream. `#` starts a line comment, which
/// is stripped before tokenization; empty lines produce no tokens but line
/// numbers are still 1-based and preserved in emitted tokens.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (line_idx, raw_line) in source.lines().enumerate() {
        let line = line_idx + 1;
        let code = match raw_line.find('#') {
            Some(idx) => &raw_line[..idx],
            None => raw_line,
        };
        let mut column = 1usize;
        let mut chars = code.char_indices().peekable();
        let mut byte = 0usize;
        while byte < code.len() {
            // Skip whitespace, tracking column by character count.
            while let Some(&(idx, ch)) = chars.peek() {
                if ch.is_whitespace() {
                    chars.next();
                    byte = idx + ch.len_utf8();
                    column += 1;
                } else {
                    break;
                }
            }
            let start_col = column;
            let start_byte = byte;
            let mut end_byte = byte;
            while let Some(&(idx, ch)) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                chars.next();
                end_byte = idx + ch.len_utf8();
                column += 1;
            }
            if end_byte > start_byte {
                let value = code[start_byte..end_byte].to_string();
                let kind = classify(&value);
                tokens.push(Token {
                    value,
                    line,
                    column: start_col,
                    kind,
                });
            }
            byte = end_byte;
            if chars.peek().is_none() {
                break;
            }
        }
    }
    tokens
}

fn classify(value: &str) -> TokenKind {
    if value.starts_with('@') {
        TokenKind::Declaration
    } else if value.starts_with('$') {
        TokenKind::MagicVar
    } else if KEYWORDS.contains(&value) {
        TokenKind::Keyword
    } else if is_numeric_literal(value) {
        TokenKind::Literal
    } else {
        TokenKind::Identifier
    }
}

/// Matches an integer or decimal literal, with an optional leading sign.
fn is_numeric_literal(value: &str) -> bool {
    let body = value.strip_prefix(['+', '-']).unwrap_or(value);
    if body.is_empty() {
        return false;
    }
    let mut seen_dot = false;
    let mut seen_digit = false;
    for ch in body.chars() {
        if ch == '.' {
            if seen_dot {
                return false;
            }
            seen_dot = true;
        } else if ch.is_ascii_digit() {
            seen_digit = true;
        } else {
            return false;
        }
    }
    seen_digit
}
