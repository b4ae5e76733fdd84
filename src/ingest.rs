//! Ingestion: fetch a page, extract its passages and commit them.
//!
//! - [`fetch`] - the [`fetch::Fetcher`] collaborator with file, HTTP and
//!   in-memory fetchers
//! - [`extract`] - the [`extract::Extractor`] collaborator with HTML and
//!   Markdown extractors
//! - [`pipeline`] - [`pipeline::IngestionPipeline`], one write transaction per
//!   source locator

pub mod extract;
pub mod fetch;
pub mod pipeline;

pub use extract::{AutoExtractor, Extractor, HtmlExtractor, MarkdownExtractor};
pub use fetch::{Fetcher, FileFetcher, HttpFetcher, LocatorFetcher, StaticFetcher};
pub use pipeline::{IngestEntry, IngestFailure, IngestOutcome, IngestReport, IngestionPipeline};
