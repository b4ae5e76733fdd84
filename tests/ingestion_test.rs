//! Ingestion from files through to search results.

use std::fs;
use std::sync::Arc;

use docseek::analysis::analyzer::StandardAnalyzer;
use docseek::config::DocseekConfig;
use docseek::document::UNTITLED_SECTION;
use docseek::error::Result;
use docseek::index::IndexStore;
use docseek::ingest::{AutoExtractor, FileFetcher, IngestOutcome, IngestionPipeline};
use docseek::query::QueryEngine;
use docseek::service::{NO_CONTENT_MESSAGE, QueryRequest, QueryService};
use tempfile::TempDir;

const SEGMENT_HTML: &str = r#"<!doctype html>
<html>
  <body>
    <nav><p>Docs home</p></nav>
    <h1>Connections</h1>
    <p>Sources send data into Segment.</p>
    <h2>Destinations</h2>
    <p>Destinations receive data from Segment &amp; forward it.</p>
  </body>
</html>"#;

fn setup() -> Result<(TempDir, TempDir, IngestionPipeline)> {
    let index = TempDir::new()?;
    let pages = TempDir::new()?;
    let analyzer = Arc::new(StandardAnalyzer::new()?);
    let store = Arc::new(IndexStore::open_in_dir(index.path(), analyzer)?);
    let pipeline = IngestionPipeline::new(
        store,
        Arc::new(FileFetcher::with_base(pages.path())),
        Arc::new(AutoExtractor::new()?),
    );
    Ok((index, pages, pipeline))
}

#[test]
fn test_html_page_passages() -> Result<()> {
    let (_index, pages, pipeline) = setup()?;
    fs::write(pages.path().join("segment.html"), SEGMENT_HTML)?;

    let outcome = pipeline.ingest("segment.html")?;
    assert_eq!(
        outcome,
        IngestOutcome::Indexed {
            version: 1,
            documents: 3
        }
    );

    let snapshot = pipeline.store().read_snapshot();
    let documents = snapshot.documents_of_source("segment.html");
    assert_eq!(documents[0].title, UNTITLED_SECTION);
    assert_eq!(documents[1].title, "Connections");
    assert_eq!(documents[1].subtitle, "");
    assert_eq!(documents[2].subtitle, "Destinations");
    assert_eq!(
        documents[2].body,
        "Destinations receive data from Segment & forward it."
    );
    Ok(())
}

#[test]
fn test_reingestion_replaces_source() -> Result<()> {
    let (_index, pages, pipeline) = setup()?;
    let page = pages.path().join("guide.md");
    let engine = QueryEngine::new(pipeline.store().clone());

    fs::write(&page, "# Guide\n\nLegacy tracking plan.\n\nLegacy identity graph.")?;
    fs::write(pages.path().join("other.md"), "Unrelated legacy page.")?;
    pipeline.ingest_all(&["guide.md", "other.md"])?;
    assert_eq!(engine.search("legacy", 10)?.len(), 3);

    fs::write(&page, "# Guide\n\nModern tracking plan.")?;
    let outcome = pipeline.ingest("guide.md")?;
    assert!(matches!(outcome, IngestOutcome::Indexed { documents: 1, .. }));

    let snapshot = pipeline.store().read_snapshot();
    snapshot.verify()?;
    assert_eq!(snapshot.source_documents("guide.md").len(), 1);
    assert_eq!(snapshot.document_count(), 2);

    let legacy = engine.search("legacy", 10)?;
    assert_eq!(legacy.len(), 1);
    assert_eq!(legacy[0].document.source, "other.md");
    assert_eq!(engine.search("modern tracking", 10)?.len(), 1);
    assert!(engine.search("identity", 10)?.is_empty());

    // Unchanged content is not committed again.
    let version = snapshot.version();
    assert_eq!(pipeline.ingest("guide.md")?, IngestOutcome::Unchanged);
    assert_eq!(pipeline.store().read_snapshot().version(), version);
    Ok(())
}

#[test]
fn test_failed_locator_does_not_abort_others() -> Result<()> {
    let (_index, pages, pipeline) = setup()?;
    fs::write(pages.path().join("good.md"), "Good passage.")?;
    fs::write(pages.path().join("bad.md"), [0xc3, 0x28])?;

    let report = pipeline.ingest_all(&["missing.md", "bad.md", "good.md"])?;
    assert_eq!(report.ingested.len(), 1);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].locator, "missing.md");
    assert!(report.failures[1].error.starts_with("Encoding error"));
    assert_eq!(pipeline.store().read_snapshot().document_count(), 1);
    Ok(())
}

#[test]
fn test_service_over_files() -> Result<()> {
    let (_index, pages, pipeline) = setup()?;
    fs::write(pages.path().join("segment.html"), SEGMENT_HTML)?;

    let config = DocseekConfig::from_json_str(
        r#"{"service": {"routes": [{"keyword": "segment", "locator": "segment.html"}]}}"#,
    )?;
    let store = pipeline.store().clone();
    let service = QueryService::from_config(
        store,
        Arc::new(FileFetcher::with_base(pages.path())),
        Arc::new(AutoExtractor::new()?),
        &config,
    )?;

    let response = service.handle(&QueryRequest::new("Segment destinations"))?;
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].subtitle, "Destinations");
    assert_eq!(response.annotations.len(), 1);

    let response = service.handle(&QueryRequest::new("Segment pricing"))?;
    assert_eq!(response.message.as_deref(), Some(NO_CONTENT_MESSAGE));
    Ok(())
}
