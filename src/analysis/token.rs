//! Token types for text analysis.
//!
//! A [`Token`] is the unit that flows through the analysis pipeline. Its
//! `position` is the ordinal of the token in the tokenizer output; filters
//! that drop tokens never renumber the survivors, so removed words leave
//! gaps that phrase matching respects.
//!
//! # Examples
//!
//! ```
//! use docseek::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 1, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.position, 1);
//! assert_eq!(token.end_offset, 11);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A token represents a single unit of text after tokenization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The text content of the token
    pub text: String,

    /// The position of the token in the original token stream (0-based)
    pub position: usize,

    /// The byte offset where this token starts in the original text
    pub start_offset: usize,

    /// The byte offset where this token ends in the original text
    pub end_offset: usize,

    /// Whether this token has been marked as stopped (removed) by a filter
    pub stopped: bool,
}

impl Token {
    /// Create a new token with the given text and position.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset: 0,
            end_offset: 0,
            stopped: false,
        }
    }

    /// Create a new token with text, position, and byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
            stopped: false,
        }
    }

    /// Get the length of the token text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Check if the token is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Mark this token as stopped.
    pub fn stop(mut self) -> Self {
        self.stopped = true;
        self
    }

    /// Check if this token is stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Clone this token with updated text.
    pub fn with_text<S: Into<String>>(&self, text: S) -> Self {
        let mut token = self.clone();
        token.text = text.into();
        token
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A token stream represents a sequence of tokens from the analysis pipeline.
pub type TokenStream = Box<dyn Iterator<Item = Token>>;

/// A normalized term and the position it occupied in the analyzed text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnalyzedTerm {
    /// Normalized term text.
    pub term: String,
    /// Token position (0-based, gaps preserved).
    pub position: u32,
}

impl From<Token> for AnalyzedTerm {
    fn from(token: Token) -> Self {
        AnalyzedTerm {
            term: token.text,
            position: token.position as u32,
        }
    }
}

/// Join analyzed terms back into text that analyzes to the same terms.
pub fn render_terms(terms: &[AnalyzedTerm]) -> String {
    terms
        .iter()
        .map(|t| t.term.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new("hello", 0);
        assert_eq!(token.text, "hello");
        assert_eq!(token.position, 0);
        assert_eq!(token.start_offset, 0);
        assert_eq!(token.end_offset, 0);
        assert!(!token.stopped);
    }

    #[test]
    fn test_token_stop_and_text() {
        let token = Token::new("Test", 3).stop();
        assert!(token.is_stopped());

        let lowered = token.with_text("test");
        assert_eq!(lowered.text, "test");
        assert_eq!(lowered.position, 3);
        assert_eq!(lowered.to_string(), "test");
    }

    #[test]
    fn test_char_len_counts_characters() {
        assert_eq!(Token::new("über", 0).char_len(), 4);
    }

    #[test]
    fn test_render_terms() {
        let terms = vec![
            AnalyzedTerm::from(Token::new("segment", 0)),
            AnalyzedTerm::from(Token::new("api", 3)),
        ];
        assert_eq!(render_terms(&terms), "segment api");
    }
}
