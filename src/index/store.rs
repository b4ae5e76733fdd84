//! The durable index store.
//!
//! An [`IndexStore`] owns the current [`Snapshot`] behind an [`ArcSwap`] and a
//! writer mutex. Readers call [`IndexStore::read_snapshot`], which is a single
//! atomic pointer load. Writers go through [`IndexStore::begin_write`]; a
//! commit serializes the successor snapshot to `snapshot.tmp`, syncs it,
//! renames it over `snapshot` and only then swaps it in.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use docseek::analysis::analyzer::standard::StandardAnalyzer;
//! use docseek::document::NewDocument;
//! use docseek::index::store::{IndexStore, StoreConfig};
//!
//! # fn main() -> docseek::error::Result<()> {
//! let store = IndexStore::open_in_memory(Arc::new(StandardAnalyzer::new()?))?;
//!
//! let mut txn = store.begin_write()?;
//! txn.add_document(NewDocument::new("guide.md", "Segment event tracking API"))?;
//! let version = txn.commit()?;
//!
//! assert_eq!(version, 1);
//! assert_eq!(store.read_snapshot().document_count(), 1);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::document::DocumentId;
use crate::error::{DocseekError, Result};
use crate::index::snapshot::Snapshot;
use crate::index::writer::WriteTransaction;
use crate::storage::file::{FileStorage, FileStorageConfig};
use crate::storage::memory::MemoryStorage;
use crate::storage::structured::{StructReader, StructWriter};
use crate::storage::Storage;

/// Name of the published snapshot file.
pub const SNAPSHOT_FILE: &str = "snapshot";

/// Name of the snapshot file while it is being written.
pub const SNAPSHOT_TEMP_FILE: &str = "snapshot.tmp";

/// Configuration of an index store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory of a file-backed index. `None` keeps the index in memory.
    pub path: Option<PathBuf>,
    /// Create an empty index when no snapshot exists yet.
    pub create_if_missing: bool,
    /// Run the snapshot invariant checker before every publish.
    pub verify_on_commit: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: None,
            create_if_missing: true,
            verify_on_commit: false,
        }
    }
}

impl StoreConfig {
    /// Configuration for a file-backed index in `path`.
    pub fn in_dir<P: AsRef<Path>>(path: P) -> Self {
        StoreConfig {
            path: Some(path.as_ref().to_path_buf()),
            ..StoreConfig::default()
        }
    }

    /// Create the storage backend this configuration points at.
    pub fn open_storage(&self) -> Result<Arc<dyn Storage>> {
        match &self.path {
            Some(path) => Ok(Arc::new(FileStorage::new(
                path,
                FileStorageConfig::new(path),
            )?)),
            None => Ok(Arc::new(MemoryStorage::new_default())),
        }
    }
}

/// Summary of the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub version: u64,
    pub documents: usize,
    pub terms: usize,
    pub sources: usize,
    pub next_doc_id: u64,
    pub committed_at: Option<DateTime<Utc>>,
    pub analyzer: String,
    pub location: String,
}

/// State guarded by the writer mutex.
#[derive(Debug)]
pub(crate) struct WriterState {
    /// Next id to hand out. Ids handed to rolled-back transactions are not
    /// returned, so this may run ahead of the published snapshot.
    pub(crate) next_doc_id: DocumentId,
}

/// A durable inverted index publishing immutable snapshots.
pub struct IndexStore {
    storage: Arc<dyn Storage>,
    analyzer: Arc<dyn Analyzer>,
    config: StoreConfig,
    current: ArcSwap<Snapshot>,
    writer: Mutex<WriterState>,
    closed: AtomicBool,
}

impl IndexStore {
    /// Open the index persisted in `storage`, or create an empty one.
    ///
    /// Fails with [`DocseekError::StoreUnavailable`] if the storage cannot be
    /// read or written, the snapshot is corrupt, or it was written with a
    /// different analyzer.
    pub fn open(
        storage: Arc<dyn Storage>,
        analyzer: Arc<dyn Analyzer>,
        config: StoreConfig,
    ) -> Result<Self> {
        let location = storage.location();
        remove_stray_temp_files(storage.as_ref())?;

        let signature = analyzer.signature();
        let (snapshot, created) = if storage.file_exists(SNAPSHOT_FILE) {
            let snapshot = load_snapshot(storage.as_ref()).map_err(|e| {
                DocseekError::store_unavailable(format!("cannot load index at {location}: {e}"))
            })?;
            if snapshot.analyzer_signature() != signature {
                return Err(DocseekError::store_unavailable(format!(
                    "index at {location} was built with analyzer '{}', not '{signature}'",
                    snapshot.analyzer_signature()
                )));
            }
            (snapshot, false)
        } else if config.create_if_missing {
            (Snapshot::empty(signature), true)
        } else {
            return Err(DocseekError::store_unavailable(format!(
                "no index at {location}"
            )));
        };

        if created {
            persist_snapshot(storage.as_ref(), &snapshot).map_err(|e| {
                DocseekError::store_unavailable(format!("cannot create index at {location}: {e}"))
            })?;
            info!("Created empty index at {location}");
        } else {
            info!(
                "Opened index at {location}: version {}, {} documents, {} terms",
                snapshot.version(),
                snapshot.document_count(),
                snapshot.term_count()
            );
        }

        Ok(IndexStore {
            storage,
            analyzer,
            config,
            writer: Mutex::new(WriterState {
                next_doc_id: snapshot.next_doc_id(),
            }),
            current: ArcSwap::from_pointee(snapshot),
            closed: AtomicBool::new(false),
        })
    }

    /// Open or create a file-backed index in `path`.
    pub fn open_in_dir<P: AsRef<Path>>(path: P, analyzer: Arc<dyn Analyzer>) -> Result<Self> {
        Self::open_with_config(analyzer, StoreConfig::in_dir(path))
    }

    /// Create an index that lives only in memory.
    pub fn open_in_memory(analyzer: Arc<dyn Analyzer>) -> Result<Self> {
        Self::open_with_config(analyzer, StoreConfig::default())
    }

    /// Open the index described by `config`.
    pub fn open_with_config(analyzer: Arc<dyn Analyzer>, config: StoreConfig) -> Result<Self> {
        let storage = config.open_storage()?;
        Self::open(storage, analyzer, config)
    }

    /// Delete the persisted snapshot so the index can be rebuilt from source.
    pub fn discard_persisted(storage: &dyn Storage) -> Result<()> {
        storage.delete_file(SNAPSHOT_TEMP_FILE)?;
        storage.delete_file(SNAPSHOT_FILE)?;
        storage.sync()?;
        warn!("Discarded persisted index at {}", storage.location());
        Ok(())
    }

    /// Start a write transaction, blocking while another one is live.
    pub fn begin_write(&self) -> Result<WriteTransaction<'_>> {
        self.check_open()?;
        let guard = self.writer.lock();
        self.check_open()?;
        Ok(WriteTransaction::new(self, guard, self.current.load_full()))
    }

    /// Start a write transaction unless another one is live.
    pub fn try_begin_write(&self) -> Result<Option<WriteTransaction<'_>>> {
        self.check_open()?;
        Ok(self
            .writer
            .try_lock()
            .map(|guard| WriteTransaction::new(self, guard, self.current.load_full())))
    }

    /// Get the current snapshot. Never blocks.
    pub fn read_snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Get the analyzer shared by indexing and querying.
    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }

    /// Get the storage backend.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Summarize the current snapshot.
    pub fn stats(&self) -> StoreStats {
        let snapshot = self.read_snapshot();
        StoreStats {
            version: snapshot.version(),
            documents: snapshot.document_count(),
            terms: snapshot.term_count(),
            sources: snapshot.source_count(),
            next_doc_id: snapshot.next_doc_id().value(),
            committed_at: snapshot.committed_at(),
            analyzer: snapshot.analyzer_signature().to_string(),
            location: self.storage.location(),
        }
    }

    /// Check the invariants of the current snapshot.
    pub fn verify(&self) -> Result<()> {
        let snapshot = self.read_snapshot();
        snapshot.verify()?;
        debug!("Snapshot version {} verified", snapshot.version());
        Ok(())
    }

    /// Wait for the live writer, sync and release the storage.
    ///
    /// Snapshots already handed out stay readable; every later write or open
    /// transaction fails.
    pub fn close(&self) -> Result<()> {
        let _guard = self.writer.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.storage.sync()?;
        self.storage.close()?;
        info!("Closed index at {}", self.storage.location());
        Ok(())
    }

    /// Whether [`IndexStore::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(DocseekError::store_unavailable("index store is closed"))
        } else {
            Ok(())
        }
    }

    /// Persist `snapshot` and make it the current one.
    ///
    /// Called by the committing transaction while it holds the writer lock.
    pub(crate) fn publish(&self, snapshot: Snapshot) -> Result<Arc<Snapshot>> {
        if self.config.verify_on_commit {
            snapshot.verify()?;
        }
        persist_snapshot(self.storage.as_ref(), &snapshot)?;

        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("location", &self.storage.location())
            .field("analyzer", &self.analyzer.signature())
            .field("version", &self.current.load().version())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn remove_stray_temp_files(storage: &dyn Storage) -> Result<()> {
    let files = storage
        .list_files()
        .map_err(|e| DocseekError::store_unavailable(e.to_string()))?;
    for name in files.iter().filter(|name| name.ends_with(".tmp")) {
        warn!("Removing leftover file {name} from {}", storage.location());
        storage
            .delete_file(name)
            .map_err(|e| DocseekError::store_unavailable(e.to_string()))?;
    }
    Ok(())
}

fn load_snapshot(storage: &dyn Storage) -> Result<Snapshot> {
    let input = storage.open_input(SNAPSHOT_FILE)?;
    Snapshot::decode(StructReader::new(input)?)
}

fn persist_snapshot(storage: &dyn Storage, snapshot: &Snapshot) -> Result<()> {
    let written = storage
        .create_output(SNAPSHOT_TEMP_FILE)
        .and_then(|output| snapshot.encode(StructWriter::new(output)))
        .and_then(|()| storage.rename_file(SNAPSHOT_TEMP_FILE, SNAPSHOT_FILE));

    if let Err(e) = written {
        if let Err(cleanup) = storage.delete_file(SNAPSHOT_TEMP_FILE) {
            warn!("Failed to remove {SNAPSHOT_TEMP_FILE}: {cleanup}");
        }
        return Err(e);
    }

    debug!(
        "Persisted snapshot version {} to {}",
        snapshot.version(),
        storage.location()
    );
    Ok(())
}
