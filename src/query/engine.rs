//! Search facade over a live [`IndexStore`].

use std::sync::Arc;

use crate::error::Result;
use crate::index::store::IndexStore;
use crate::query::evaluator::{Evaluator, ScanControl, SearchHit};
use crate::query::parser::{DefaultOperator, QueryParser};
use crate::query::query::Query;
use crate::query::scorer::{Scorer, TfIdfScorer};

/// Parses query strings with the store's analyzer and evaluates them against
/// the store's current snapshot.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<IndexStore>,
    parser: QueryParser,
    scorer: Arc<dyn Scorer>,
}

impl QueryEngine {
    /// Create an engine with the AND default operator and TF-IDF scoring.
    pub fn new(store: Arc<IndexStore>) -> Self {
        let parser = QueryParser::new(store.analyzer().clone());
        QueryEngine {
            store,
            parser,
            scorer: Arc::new(TfIdfScorer),
        }
    }

    /// Use `operator` between juxtaposed query words.
    pub fn with_default_operator(mut self, operator: DefaultOperator) -> Self {
        self.parser = self.parser.with_default_operator(operator);
        self
    }

    /// Replace the scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    /// Parse `query_str` without touching the index.
    pub fn parse(&self, query_str: &str) -> Result<Query> {
        self.parser.parse(query_str)
    }

    /// Search for at most `limit` hits.
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.search_with(query_str, limit, &ScanControl::default())
    }

    /// Search with cancellation and deadline control.
    pub fn search_with(
        &self,
        query_str: &str,
        limit: usize,
        control: &ScanControl,
    ) -> Result<Vec<SearchHit>> {
        let query = self.parser.parse(query_str)?;
        self.search_query(&query, limit, control)
    }

    /// Evaluate an already parsed query against a fresh snapshot.
    pub fn search_query(
        &self,
        query: &Query,
        limit: usize,
        control: &ScanControl,
    ) -> Result<Vec<SearchHit>> {
        let snapshot = self.store.read_snapshot();
        Evaluator::new(&snapshot, self.scorer.as_ref(), control).search(query, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::standard::StandardAnalyzer;
    use crate::document::NewDocument;
    use crate::error::DocseekError;

    fn engine() -> QueryEngine {
        let analyzer = Arc::new(StandardAnalyzer::new().unwrap());
        let store = Arc::new(IndexStore::open_in_memory(analyzer).unwrap());
        QueryEngine::new(store)
    }

    #[test]
    fn test_empty_index() {
        let engine = engine();
        assert!(engine.search("segment", 5).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_query_is_rejected() {
        let engine = engine();
        let err = engine.search("(segment", 5).unwrap_err();
        assert!(matches!(err, DocseekError::MalformedQuery(_)));
        assert!(engine.search("   ", 5).is_err());
    }

    #[test]
    fn test_search_sees_new_commits() {
        let engine = engine();
        let mut txn = engine.store().begin_write().unwrap();
        txn.add_document(NewDocument::new("docs/a", "Segment event tracking API"))
            .unwrap();
        txn.commit().unwrap();

        let hits = engine.search("tracking api", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.source, "docs/a");
    }

    #[test]
    fn test_default_operator_or() {
        let engine = engine().with_default_operator(DefaultOperator::Or);
        let mut txn = engine.store().begin_write().unwrap();
        txn.add_document(NewDocument::new("a", "alpha")).unwrap();
        txn.add_document(NewDocument::new("b", "beta")).unwrap();
        txn.commit().unwrap();

        assert_eq!(engine.search("alpha beta", 5).unwrap().len(), 2);
    }

    #[test]
    fn test_exclusion_under_or_default() {
        let engine = engine().with_default_operator(DefaultOperator::Or);
        let mut txn = engine.store().begin_write().unwrap();
        txn.add_document(NewDocument::new("a", "segment tracking")).unwrap();
        txn.add_document(NewDocument::new("b", "segment lytics")).unwrap();
        txn.add_document(NewDocument::new("c", "mparticle pipeline"))
            .unwrap();
        txn.commit().unwrap();

        let hits = engine.search("segment -lytics", 5).unwrap();
        let sources: Vec<&str> = hits.iter().map(|h| h.document.source.as_str()).collect();
        assert_eq!(sources, vec!["a"]);

        let hits = engine.search("segment mparticle -lytics", 5).unwrap();
        let mut sources: Vec<&str> = hits.iter().map(|h| h.document.source.as_str()).collect();
        sources.sort();
        assert_eq!(sources, vec!["a", "c"]);
    }
}
