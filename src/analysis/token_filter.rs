//! Token filter implementations for token transformation.
//!
//! - [`lowercase::LowercaseFilter`] - Converts tokens to lowercase
//! - [`stop::StopFilter`] - Removes stop words
//! - [`length::LengthFilter`] - Removes tokens shorter than a minimum length
//!
//! Filters are chained by an analyzer:
//!
//! ```text
//! Tokenizer → Lowercase → Stop Words → Length → Index
//! ```

pub mod length;
pub mod lowercase;
pub mod stop;

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for filters that transform token streams.
///
/// Filters receive a stream of tokens and produce a new stream. They must
/// not renumber token positions.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter (for debugging and configuration).
    fn name(&self) -> &'static str;
}
