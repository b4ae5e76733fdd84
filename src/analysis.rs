//! Text analysis for docseek.
//!
//! Analysis turns free text into normalized `(term, position)` pairs. The
//! same analyzer instance is shared by the index writer and the query parser
//! so that indexing-time and query-time tokenization never diverge.
//!
//! The pipeline is a tokenizer followed by a chain of token filters:
//!
//! ```text
//! Raw Text → RegexTokenizer → Lowercase → Stop Words → Min Length → Terms
//! ```

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::*;
pub use token::*;
pub use token_filter::*;
pub use tokenizer::*;
