//! Crash safety of the persisted snapshot.

use std::fs;
use std::sync::Arc;

use docseek::analysis::analyzer::{Analyzer, StandardAnalyzer};
use docseek::document::NewDocument;
use docseek::error::{DocseekError, Result};
use docseek::index::IndexStore;
use docseek::index::store::{SNAPSHOT_FILE, SNAPSHOT_TEMP_FILE, StoreConfig};
use docseek::ingest::{IngestionPipeline, MarkdownExtractor, StaticFetcher};
use tempfile::TempDir;

fn analyzer() -> Arc<dyn Analyzer> {
    Arc::new(StandardAnalyzer::new().unwrap())
}

fn populate(dir: &TempDir) -> Result<()> {
    let store = IndexStore::open_in_dir(dir.path(), analyzer())?;
    let mut txn = store.begin_write()?;
    txn.add_document(NewDocument::new("docs/a", "Segment event tracking API"))?;
    txn.add_document(NewDocument::new("docs/b", "Lytics audience segment builder"))?;
    txn.commit()?;
    store.close()
}

#[test]
fn test_leftover_temp_file_is_ignored() -> Result<()> {
    let dir = TempDir::new()?;
    populate(&dir)?;

    // A commit that crashed before its rename.
    fs::write(dir.path().join(SNAPSHOT_TEMP_FILE), b"half written")?;

    let store = IndexStore::open_in_dir(dir.path(), analyzer())?;
    assert!(!dir.path().join(SNAPSHOT_TEMP_FILE).exists());
    assert_eq!(store.stats().version, 1);
    assert_eq!(store.stats().documents, 2);
    store.verify()?;
    Ok(())
}

#[test]
fn test_corrupt_snapshot_is_unavailable() -> Result<()> {
    let dir = TempDir::new()?;
    populate(&dir)?;
    let path = dir.path().join(SNAPSHOT_FILE);

    let mut bytes = fs::read(&path)?;
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    fs::write(&path, &bytes)?;

    let err = IndexStore::open_in_dir(dir.path(), analyzer()).unwrap_err();
    assert!(matches!(err, DocseekError::StoreUnavailable(_)), "{err}");
    assert!(err.is_fatal());
    Ok(())
}

#[test]
fn test_truncated_snapshot_is_unavailable() -> Result<()> {
    let dir = TempDir::new()?;
    populate(&dir)?;
    let path = dir.path().join(SNAPSHOT_FILE);

    let bytes = fs::read(&path)?;
    for len in [0, 3, bytes.len() / 2, bytes.len() - 1] {
        fs::write(&path, &bytes[..len])?;
        let err = IndexStore::open_in_dir(dir.path(), analyzer()).unwrap_err();
        assert!(matches!(err, DocseekError::StoreUnavailable(_)), "len {len}: {err}");
    }
    Ok(())
}

#[test]
fn test_rebuild_after_discard() -> Result<()> {
    let dir = TempDir::new()?;
    populate(&dir)?;
    fs::write(dir.path().join(SNAPSHOT_FILE), b"garbage")?;

    let config = StoreConfig::in_dir(dir.path());
    let storage = config.open_storage()?;
    IndexStore::discard_persisted(storage.as_ref())?;

    let store = Arc::new(IndexStore::open(storage, analyzer(), config)?);
    let fetcher = Arc::new(StaticFetcher::new().with_page("docs/a", "# Tracking\n\nTrack calls."));
    let pipeline = IngestionPipeline::new(store.clone(), fetcher, Arc::new(MarkdownExtractor));

    let report = pipeline.rebuild(&["docs/a"])?;
    assert!(report.is_success());
    store.close()?;

    let reopened = IndexStore::open_in_dir(dir.path(), analyzer())?;
    assert_eq!(reopened.stats().documents, 1);
    assert_eq!(reopened.stats().version, 2);
    Ok(())
}
