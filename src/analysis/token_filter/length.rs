//! Minimum length filter implementation.

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// A filter that drops tokens shorter than `min_length` characters.
///
/// A minimum of 0 or 1 keeps every non-empty token.
#[derive(Clone, Debug)]
pub struct LengthFilter {
    min_length: usize,
}

impl LengthFilter {
    /// Create a filter with the given minimum length in characters.
    pub fn new(min_length: usize) -> Self {
        LengthFilter { min_length }
    }

    /// Get the configured minimum length.
    pub fn min_length(&self) -> usize {
        self.min_length
    }
}

impl Filter for LengthFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let min_length = self.min_length.max(1);
        let filtered: Vec<Token> = tokens
            .filter(|token| token.char_len() >= min_length)
            .collect();

        Ok(Box::new(filtered.into_iter()))
    }

    fn name(&self) -> &'static str {
        "length"
    }
}
