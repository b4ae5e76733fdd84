//! Scoring implementations for ranking search results.

use std::fmt::Debug;

/// Trait for document scorers.
///
/// Scores must be a pure function of their inputs so that ranking is
/// deterministic for a given snapshot and query.
pub trait Scorer: Send + Sync + Debug {
    /// Inverse document frequency of a term found in `doc_freq` of
    /// `total_docs` documents.
    fn idf(&self, doc_freq: usize, total_docs: usize) -> f32;

    /// Score of a term occurring `term_freq` times in a document.
    fn term_score(&self, term_freq: u32, idf: f32) -> f32;

    /// Score of a phrase occurring `phrase_freq` times, given the sum of the
    /// idf of its terms.
    fn phrase_score(&self, phrase_freq: u32, idf_sum: f32) -> f32 {
        self.term_score(phrase_freq, idf_sum)
    }

    /// Get the name of this scorer.
    fn name(&self) -> &'static str;
}

/// TF-IDF scorer: `sqrt(tf) * idf` with `idf = 1 + ln(N / (df + 1))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfIdfScorer;

impl TfIdfScorer {
    /// Create a new TF-IDF scorer.
    pub fn new() -> Self {
        TfIdfScorer
    }
}

impl Scorer for TfIdfScorer {
    fn idf(&self, doc_freq: usize, total_docs: usize) -> f32 {
        if total_docs == 0 {
            return 0.0;
        }
        let n = total_docs as f64;
        let df = doc_freq as f64;
        (1.0 + (n / (df + 1.0)).ln()) as f32
    }

    fn term_score(&self, term_freq: u32, idf: f32) -> f32 {
        (term_freq as f32).sqrt() * idf
    }

    fn name(&self) -> &'static str {
        "tf_idf"
    }
}
