//! Write transactions.
//!
//! A [`WriteTransaction`] buffers added documents and scheduled deletions.
//! Nothing is visible to readers until [`WriteTransaction::commit`] succeeds;
//! a failed commit, [`WriteTransaction::rollback`] or simply dropping the
//! transaction leaves the published snapshot untouched.
//!
//! Committing replaces, per source, every document from earlier commits with
//! the documents added in this transaction. Documents of the same source
//! added within one transaction all survive.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use parking_lot::MutexGuard;
use uuid::Uuid;

use crate::analysis::token::AnalyzedTerm;
use crate::document::{DocumentId, NewDocument};
use crate::error::{DocseekError, Result};
use crate::index::snapshot::Snapshot;
use crate::index::store::{IndexStore, WriterState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

#[derive(Debug)]
struct PendingDocument {
    id: DocumentId,
    document: NewDocument,
    terms: Vec<AnalyzedTerm>,
}

/// An exclusive write transaction on an [`IndexStore`].
pub struct WriteTransaction<'a> {
    store: &'a IndexStore,
    writer: MutexGuard<'a, WriterState>,
    base: Arc<Snapshot>,
    id: Uuid,
    pending: Vec<PendingDocument>,
    deleted_sources: BTreeSet<String>,
    clear: bool,
    state: TransactionState,
}

impl<'a> WriteTransaction<'a> {
    pub(crate) fn new(
        store: &'a IndexStore,
        mut writer: MutexGuard<'a, WriterState>,
        base: Arc<Snapshot>,
    ) -> Self {
        if writer.next_doc_id < base.next_doc_id() {
            writer.next_doc_id = base.next_doc_id();
        }
        let id = Uuid::new_v4();
        debug!("Transaction {id} started on version {}", base.version());

        WriteTransaction {
            store,
            writer,
            base,
            id,
            pending: Vec::new(),
            deleted_sources: BTreeSet::new(),
            clear: false,
            state: TransactionState::Active,
        }
    }

    /// Identifier used to correlate log lines of this transaction.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The snapshot this transaction builds on.
    pub fn base(&self) -> &Arc<Snapshot> {
        &self.base
    }

    /// Number of documents added so far.
    pub fn pending_documents(&self) -> usize {
        self.pending.len()
    }

    /// Whether the transaction would change the index.
    pub fn has_changes(&self) -> bool {
        self.clear || !self.pending.is_empty() || !self.deleted_sources.is_empty()
    }

    fn check_active(&self) -> Result<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(DocseekError::invalid_operation(format!(
                "transaction {} is already committed",
                self.id
            ))),
            TransactionState::RolledBack => Err(DocseekError::invalid_operation(format!(
                "transaction {} was rolled back",
                self.id
            ))),
        }
    }

    /// Analyze and buffer a document, returning the id it will be stored under.
    pub fn add_document(&mut self, document: NewDocument) -> Result<DocumentId> {
        self.check_active()?;
        document.validate()?;

        let terms = self.store.analyzer().analyze_terms(&document.body)?;
        let id = self.writer.next_doc_id;
        self.writer.next_doc_id = id.next();

        self.pending.push(PendingDocument {
            id,
            document,
            terms,
        });
        Ok(id)
    }

    /// Schedule removal of every document of `source`, including documents
    /// of that source added earlier in this transaction.
    pub fn delete_source(&mut self, source: &str) -> Result<()> {
        self.check_active()?;
        self.pending.retain(|pending| pending.document.source != source);
        self.deleted_sources.insert(source.to_string());
        Ok(())
    }

    /// Schedule removal of every document, including the ones added earlier
    /// in this transaction.
    pub fn clear(&mut self) -> Result<()> {
        self.check_active()?;
        self.pending.clear();
        self.deleted_sources.clear();
        self.clear = true;
        Ok(())
    }

    /// Atomically apply all pending changes and publish the new snapshot.
    ///
    /// Returns the version of the published snapshot, or the base version
    /// if the transaction holds no changes.
    pub fn commit(mut self) -> Result<u64> {
        self.check_active()?;

        if !self.has_changes() {
            self.state = TransactionState::Committed;
            debug!("Transaction {} committed without changes", self.id);
            return Ok(self.base.version());
        }

        let added = self.pending.len();
        let next = self.build_successor()?;
        let version = next.version();
        let documents = next.document_count();

        self.store.publish(next)?;
        self.state = TransactionState::Committed;

        info!(
            "Transaction {} committed version {version}: {added} added, {documents} documents total",
            self.id
        );
        Ok(version)
    }

    fn build_successor(&mut self) -> Result<Snapshot> {
        let mut next = Snapshot::clone(&self.base);

        if self.clear {
            next.clear_documents();
        }

        let replaced: BTreeSet<&str> = self
            .deleted_sources
            .iter()
            .map(String::as_str)
            .chain(self.pending.iter().map(|p| p.document.source.as_str()))
            .collect();

        let mut removed = 0usize;
        for source in replaced {
            let ids = next.source_documents(source).to_vec();
            for id in ids {
                if next.remove_document(id) {
                    removed += 1;
                }
            }
        }

        for pending in self.pending.drain(..) {
            let document = pending.document.into_document(pending.id);
            next.insert_document(document, &pending.terms)?;
        }

        debug!(
            "Transaction {} removed {removed} documents from version {}",
            self.id,
            self.base.version()
        );

        next.set_commit_metadata(
            self.base.version() + 1,
            self.writer.next_doc_id,
            Utc::now(),
        );
        Ok(next)
    }

    /// Discard all pending work. Calling it more than once is harmless.
    pub fn rollback(&mut self) {
        if self.state == TransactionState::Active {
            debug!(
                "Transaction {} rolled back with {} pending documents",
                self.id,
                self.pending.len()
            );
            self.pending.clear();
            self.deleted_sources.clear();
            self.clear = false;
            self.state = TransactionState::RolledBack;
        }
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        self.rollback();
    }
}

impl std::fmt::Debug for WriteTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTransaction")
            .field("id", &self.id)
            .field("base_version", &self.base.version())
            .field("pending", &self.pending.len())
            .field("deleted_sources", &self.deleted_sources)
            .field("clear", &self.clear)
            .field("state", &self.state)
            .finish()
    }
}
