//! Standard analyzer used for both indexing and querying.
//!
//! # Pipeline
//!
//! 1. RegexTokenizer (`\w+`, strips punctuation)
//! 2. LowercaseFilter
//! 3. StopFilter (33 common English stop words), if `strip_stopwords`
//! 4. LengthFilter (`min_term_length`)
//!
//! # Examples
//!
//! ```
//! use docseek::analysis::analyzer::analyzer::Analyzer;
//! use docseek::analysis::analyzer::standard::StandardAnalyzer;
//!
//! let analyzer = StandardAnalyzer::new().unwrap();
//! let tokens: Vec<_> = analyzer.analyze("Hello the world and test").unwrap().collect();
//!
//! // "the" and "and" are filtered out as stop words
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[0].text, "hello");
//! assert_eq!(tokens[1].text, "world");
//! assert_eq!(tokens[2].text, "test");
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::length::LengthFilter;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::tokenizer::regex::RegexTokenizer;
use crate::error::Result;

/// Configuration knobs of the standard analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Remove English stop words.
    pub strip_stopwords: bool,
    /// Drop terms shorter than this many characters.
    pub min_term_length: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            strip_stopwords: true,
            min_term_length: 1,
        }
    }
}

/// A standard analyzer: regex tokenization, lowercasing, optional stop word
/// removal and a minimum term length.
pub struct StandardAnalyzer {
    inner: PipelineAnalyzer,
    config: AnalyzerConfig,
}

impl StandardAnalyzer {
    /// Create a new standard analyzer with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(AnalyzerConfig::default())
    }

    /// Create a new standard analyzer without stop word filtering.
    pub fn without_stop_words() -> Result<Self> {
        Self::with_config(AnalyzerConfig {
            strip_stopwords: false,
            ..AnalyzerConfig::default()
        })
    }

    /// Create a standard analyzer from explicit configuration.
    pub fn with_config(config: AnalyzerConfig) -> Result<Self> {
        let tokenizer = Arc::new(RegexTokenizer::new()?);
        let mut analyzer =
            PipelineAnalyzer::new(tokenizer).add_filter(Arc::new(LowercaseFilter::new()));

        if config.strip_stopwords {
            analyzer = analyzer.add_filter(Arc::new(StopFilter::new()));
        }
        if config.min_term_length > 1 {
            analyzer = analyzer.add_filter(Arc::new(LengthFilter::new(config.min_term_length)));
        }

        Ok(StandardAnalyzer {
            inner: analyzer.with_name("standard"),
            config,
        })
    }

    /// Get the configuration this analyzer was built from.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Get the inner pipeline analyzer.
    pub fn inner(&self) -> &PipelineAnalyzer {
        &self.inner
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        "standard"
    }

    fn signature(&self) -> String {
        format!(
            "standard(stopwords={},min_len={})",
            self.config.strip_stopwords,
            self.config.min_term_length.max(1)
        )
    }
}

impl std::fmt::Debug for StandardAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardAnalyzer")
            .field("config", &self.config)
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::{render_terms, Token};

    use proptest::prelude::*;

    #[test]
    fn test_standard_analyzer() {
        let analyzer = StandardAnalyzer::new().unwrap();

        let tokens: Vec<Token> = analyzer
            .analyze("Hello the world and test")
            .unwrap()
            .collect();

        // "the" and "and" should be filtered out
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[2].text, "test");
    }

    #[test]
    fn test_standard_analyzer_without_stop_words() {
        let analyzer = StandardAnalyzer::without_stop_words().unwrap();

        let tokens: Vec<Token> = analyzer.analyze("Hello the World").unwrap().collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].text, "the");
    }

    #[test]
    fn test_min_term_length() {
        let analyzer = StandardAnalyzer::with_config(AnalyzerConfig {
            strip_stopwords: false,
            min_term_length: 3,
        })
        .unwrap();

        let terms = analyzer.analyze_terms("Go to the API docs").unwrap();
        let texts: Vec<_> = terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(texts, vec!["the", "api", "docs"]);
        assert_eq!(terms[1].position, 3);
    }

    #[test]
    fn test_signature_reflects_config() {
        let default = StandardAnalyzer::new().unwrap();
        let no_stop = StandardAnalyzer::without_stop_words().unwrap();

        assert_eq!(default.signature(), "standard(stopwords=true,min_len=1)");
        assert_ne!(default.signature(), no_stop.signature());
    }

    #[test]
    fn test_analyze_bytes_rejects_invalid_utf8() {
        let analyzer = StandardAnalyzer::new().unwrap();
        let err = analyzer.analyze_bytes(&[0x66, 0x6f, 0xff, 0x6f]).unwrap_err();
        assert!(matches!(err, crate::error::DocseekError::Encoding(_)));

        let terms = analyzer.analyze_bytes("Segment API".as_bytes()).unwrap();
        assert_eq!(terms.len(), 2);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: AnalyzerConfig = serde_json::from_str(r#"{"min_term_length": 2}"#).unwrap();
        assert!(config.strip_stopwords);
        assert_eq!(config.min_term_length, 2);
    }

    proptest! {
        #[test]
        fn prop_analysis_is_idempotent(text in "\\PC{0,80}", strip in any::<bool>(), min_len in 0usize..4) {
            let analyzer = StandardAnalyzer::with_config(AnalyzerConfig {
                strip_stopwords: strip,
                min_term_length: min_len,
            }).unwrap();

            let first = analyzer.analyze_terms(&text).unwrap();
            let second = analyzer.analyze_terms(&render_terms(&first)).unwrap();

            let first_terms: Vec<_> = first.iter().map(|t| t.term.clone()).collect();
            let second_terms: Vec<_> = second.iter().map(|t| t.term.clone()).collect();
            prop_assert_eq!(first_terms, second_terms);
        }

        #[test]
        fn prop_positions_strictly_increase(text in "[a-zA-Z ,.!]{0,80}") {
            let analyzer = StandardAnalyzer::new().unwrap();
            let terms = analyzer.analyze_terms(&text).unwrap();
            for pair in terms.windows(2) {
                prop_assert!(pair[0].position < pair[1].position);
            }
        }
    }
}
