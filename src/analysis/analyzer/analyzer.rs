//! Core analyzer trait definition.
//!
//! ```text
//! Raw Text → Analyzer → Token Stream → (term, position) pairs
//!             ↓
//!         Tokenizer
//!             ↓
//!         Filter 1..N
//! ```
//!
//! # Examples
//!
//! ```
//! use docseek::analysis::analyzer::analyzer::Analyzer;
//! use docseek::analysis::analyzer::standard::StandardAnalyzer;
//!
//! let analyzer = StandardAnalyzer::new().unwrap();
//! let terms = analyzer.analyze_terms("The Segment tracking API").unwrap();
//!
//! assert_eq!(terms[0].term, "segment");
//! assert_eq!(terms[0].position, 1);
//! ```

use crate::analysis::token::{AnalyzedTerm, TokenStream};
use crate::error::{DocseekError, Result};

/// Trait for analyzers that convert text into processed tokens.
///
/// Implementations must be deterministic: the same text always yields the
/// same tokens. The index writer and the query parser rely on this to stay
/// symmetric.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &'static str;

    /// A string that identifies the analyzer together with its configuration.
    ///
    /// The index store persists it and refuses to open an index written with
    /// a different signature.
    fn signature(&self) -> String {
        self.name().to_string()
    }

    /// Analyze text into normalized terms, skipping stopped tokens.
    fn analyze_terms(&self, text: &str) -> Result<Vec<AnalyzedTerm>> {
        Ok(self
            .analyze(text)?
            .filter(|token| !token.is_stopped() && !token.is_empty())
            .map(AnalyzedTerm::from)
            .collect())
    }

    /// Analyze raw bytes, failing with an encoding error if they are not UTF-8.
    fn analyze_bytes(&self, bytes: &[u8]) -> Result<Vec<AnalyzedTerm>> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            DocseekError::encoding(format!(
                "invalid UTF-8 at byte {}: {e}",
                e.valid_up_to()
            ))
        })?;
        self.analyze_terms(text)
    }
}
