//! # docseek
//!
//! Passage search over documentation pages.
//!
//! ## Features
//!
//! - Pages are folded into `(title, subtitle, passage)` documents
//! - A transactional inverted index with lock-free snapshot reads
//! - Crash-safe persistence behind a pluggable storage backend
//! - Boolean and phrase queries with TF-IDF ranking
//! - Parallel ingestion with replace-on-commit per source
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use docseek::prelude::*;
//!
//! let analyzer = Arc::new(StandardAnalyzer::new().unwrap());
//! let store = Arc::new(IndexStore::open_in_memory(analyzer).unwrap());
//!
//! let mut txn = store.begin_write().unwrap();
//! txn.add_document(NewDocument::new("docs/segment", "Segment event tracking API")).unwrap();
//! txn.add_document(NewDocument::new("docs/lytics", "Lytics audience segment builder")).unwrap();
//! txn.commit().unwrap();
//!
//! let engine = QueryEngine::new(store);
//! let hits = engine.search("segment -audience", 5).unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].document.source, "docs/segment");
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod ingest;
pub mod query;
pub mod service;
pub mod storage;
pub mod util;

pub mod prelude {
    pub use crate::analysis::analyzer::{Analyzer, AnalyzerConfig, StandardAnalyzer};
    pub use crate::config::DocseekConfig;
    pub use crate::document::{Document, DocumentId, NewDocument, Passage};
    pub use crate::error::{DocseekError, Result};
    pub use crate::index::{IndexStore, Snapshot, StoreConfig, WriteTransaction};
    pub use crate::ingest::{
        Extractor, Fetcher, FileFetcher, HtmlExtractor, IngestOutcome, IngestionPipeline,
        MarkdownExtractor, StaticFetcher,
    };
    pub use crate::query::{
        CancellationToken, Query, QueryEngine, QueryParser, ScanControl, SearchHit,
    };
    pub use crate::service::{QueryRequest, QueryResponse, QueryService};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
