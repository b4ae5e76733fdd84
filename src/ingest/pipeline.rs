//! The ingestion pipeline.
//!
//! Each source locator is fetched, extracted and committed in its own write
//! transaction. Committing a source replaces every document it had before, so
//! re-ingesting a page never duplicates passages. When the extracted passages
//! equal the indexed ones nothing is written.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::document::{NewDocument, Passage};
use crate::error::Result;
use crate::index::store::IndexStore;
use crate::ingest::extract::Extractor;
use crate::ingest::fetch::Fetcher;

/// Result of ingesting one locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The source was (re)indexed with `documents` passages.
    Indexed { version: u64, documents: usize },
    /// The indexed passages already match the page.
    Unchanged,
    /// The page yielded no passages; any earlier documents were removed.
    Empty,
}

impl fmt::Display for IngestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestOutcome::Indexed { version, documents } => {
                write!(f, "indexed {documents} passages (version {version})")
            }
            IngestOutcome::Unchanged => write!(f, "unchanged"),
            IngestOutcome::Empty => write!(f, "no passages"),
        }
    }
}

/// A locator that was ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestEntry {
    pub locator: String,
    #[serde(flatten)]
    pub outcome: IngestOutcome,
}

/// A locator that failed to ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestFailure {
    pub locator: String,
    pub error: String,
}

/// Aggregate result of [`IngestionPipeline::ingest_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub ingested: Vec<IngestEntry>,
    pub failures: Vec<IngestFailure>,
    pub elapsed_ms: u64,
}

impl IngestReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of documents written by this run.
    pub fn documents_indexed(&self) -> usize {
        self.ingested
            .iter()
            .map(|entry| match entry.outcome {
                IngestOutcome::Indexed { documents, .. } => documents,
                _ => 0,
            })
            .sum()
    }
}

/// Fetch, extract and commit pages into an [`IndexStore`].
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    store: Arc<IndexStore>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<IndexStore>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        IngestionPipeline {
            store,
            fetcher,
            extractor,
        }
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    /// Fetch and extract `locator` without writing anything.
    pub fn extract(&self, locator: &str) -> Result<Vec<Passage>> {
        let raw = self.fetcher.fetch(locator)?;
        let passages = self.extractor.extract(&raw)?;
        debug!(
            "Extracted {} passages from {locator} with the {} extractor",
            passages.len(),
            self.extractor.name()
        );
        Ok(passages)
    }

    /// Ingest one locator in its own transaction.
    pub fn ingest(&self, locator: &str) -> Result<IngestOutcome> {
        let passages = self.extract(locator)?;
        self.commit_passages(locator, passages)
    }

    /// Replace the indexed passages of `locator` with `passages`.
    pub fn commit_passages(&self, locator: &str, passages: Vec<Passage>) -> Result<IngestOutcome> {
        let mut txn = self.store.begin_write()?;

        let indexed: Vec<Passage> = txn
            .base()
            .documents_of_source(locator)
            .into_iter()
            .map(|document| document.passage())
            .collect();

        if indexed == passages {
            txn.rollback();
            let outcome = if passages.is_empty() {
                IngestOutcome::Empty
            } else {
                IngestOutcome::Unchanged
            };
            debug!("Source {locator}: {outcome}");
            return Ok(outcome);
        }

        let outcome = if passages.is_empty() {
            txn.delete_source(locator)?;
            txn.commit()?;
            IngestOutcome::Empty
        } else {
            let documents = passages.len();
            for passage in passages {
                txn.add_document(NewDocument::from_passage(passage, locator))?;
            }
            let version = txn.commit()?;
            IngestOutcome::Indexed { version, documents }
        };

        info!(
            "Source {locator}: {outcome}, replaced {} earlier passages",
            indexed.len()
        );
        Ok(outcome)
    }

    /// Ingest every locator, fetching and extracting in parallel and
    /// committing in locator order.
    ///
    /// Per-locator failures are collected in the report. A store failure
    /// that makes further commits impossible aborts the run.
    pub fn ingest_all<S>(&self, locators: &[S]) -> Result<IngestReport>
    where
        S: AsRef<str> + Sync,
    {
        let started = Instant::now();

        let extracted: Vec<(&str, Result<Vec<Passage>>)> = locators
            .par_iter()
            .map(|locator| {
                let locator = locator.as_ref();
                (locator, self.extract(locator))
            })
            .collect();

        let mut report = IngestReport::default();
        for (locator, passages) in extracted {
            match passages.and_then(|passages| self.commit_passages(locator, passages)) {
                Ok(outcome) => report.ingested.push(IngestEntry {
                    locator: locator.to_string(),
                    outcome,
                }),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Failed to ingest {locator}: {e}");
                    report.failures.push(IngestFailure {
                        locator: locator.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "Ingested {} locators ({} failed), {} documents written in {}ms",
            report.ingested.len(),
            report.failures.len(),
            report.documents_indexed(),
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Remove every document, then ingest `locators` from scratch.
    pub fn rebuild<S>(&self, locators: &[S]) -> Result<IngestReport>
    where
        S: AsRef<str> + Sync,
    {
        let mut txn = self.store.begin_write()?;
        txn.clear()?;
        let version = txn.commit()?;
        info!("Cleared index at version {version} for rebuild");

        self.ingest_all(locators)
    }

    /// Ingest `locator` unless the store already holds documents for it.
    pub fn ensure_indexed(&self, locator: &str) -> Result<Option<IngestOutcome>> {
        if self.store.read_snapshot().source_documents(locator).is_empty() {
            self.ingest(locator).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::standard::StandardAnalyzer;
    use crate::ingest::extract::MarkdownExtractor;
    use crate::ingest::fetch::StaticFetcher;

    fn pipeline(fetcher: Arc<StaticFetcher>) -> IngestionPipeline {
        let analyzer = Arc::new(StandardAnalyzer::new().unwrap());
        let store = Arc::new(IndexStore::open_in_memory(analyzer).unwrap());
        IngestionPipeline::new(store, fetcher, Arc::new(MarkdownExtractor))
    }

    #[test]
    fn test_ingest_and_reingest() {
        let fetcher = Arc::new(
            StaticFetcher::new().with_page("docs/a", "# Tracking\n\nTrack calls.\n\nPage calls."),
        );
        let pipeline = pipeline(fetcher.clone());

        let outcome = pipeline.ingest("docs/a").unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Indexed {
                version: 1,
                documents: 2
            }
        );
        assert_eq!(pipeline.ingest("docs/a").unwrap(), IngestOutcome::Unchanged);
        assert_eq!(pipeline.store().read_snapshot().version(), 1);

        fetcher.insert("docs/a", "# Tracking\n\nIdentify calls.");
        let outcome = pipeline.ingest("docs/a").unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Indexed {
                version: 2,
                documents: 1
            }
        );

        let snapshot = pipeline.store().read_snapshot();
        assert_eq!(snapshot.document_count(), 1);
        assert!(snapshot.postings("track").is_none());
        assert!(snapshot.postings("identify").is_some());
    }

    #[test]
    fn test_empty_page_removes_source() {
        let fetcher = Arc::new(StaticFetcher::new().with_page("docs/a", "Some text."));
        let pipeline = pipeline(fetcher.clone());
        pipeline.ingest("docs/a").unwrap();

        fetcher.insert("docs/a", "# Only a heading");
        assert_eq!(pipeline.ingest("docs/a").unwrap(), IngestOutcome::Empty);
        assert!(pipeline.store().read_snapshot().is_empty());

        // Nothing to remove the second time.
        assert_eq!(pipeline.ingest("docs/a").unwrap(), IngestOutcome::Empty);
        assert_eq!(pipeline.store().read_snapshot().version(), 2);
    }

    #[test]
    fn test_ingest_all_collects_failures() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_page("a", "alpha passage")
                .with_page("b", "beta passage"),
        );
        let pipeline = pipeline(fetcher);

        let report = pipeline.ingest_all(&["a", "missing", "b"]).unwrap();
        assert!(!report.is_success());
        assert_eq!(report.ingested.len(), 2);
        assert_eq!(report.documents_indexed(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].locator, "missing");
        assert_eq!(pipeline.store().read_snapshot().document_count(), 2);
    }

    #[test]
    fn test_rebuild_and_ensure_indexed() {
        let fetcher = Arc::new(StaticFetcher::new().with_page("a", "alpha"));
        let pipeline = pipeline(fetcher.clone());

        assert!(pipeline.ensure_indexed("a").unwrap().is_some());
        assert!(pipeline.ensure_indexed("a").unwrap().is_none());

        fetcher.insert("b", "beta");
        let report = pipeline.rebuild(&["b"]).unwrap();
        assert!(report.is_success());

        let snapshot = pipeline.store().read_snapshot();
        assert_eq!(snapshot.sources().collect::<Vec<_>>(), vec!["b"]);
    }
}
