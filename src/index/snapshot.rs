//! Immutable index snapshots and their on-disk format.
//!
//! A [`Snapshot`] maps terms to shared posting lists and document ids to
//! stored documents. Successor snapshots are built copy-on-write: untouched
//! posting lists and documents are shared through `Arc`, touched posting
//! lists are cloned by `Arc::make_mut`.
//!
//! # File format
//!
//! ```text
//! magic "DSEK" | u32 format version | analyzer signature
//! u64 version | u64 next_doc_id | u8 has_timestamp [i64 millis]
//! varint document count, per document: varint id delta, title, subtitle, body, source
//! varint term count, per term: term, posting list
//! u32 CRC32 of everything above
//! ```
//!
//! Per-document term lists and the source table are rebuilt from the posting
//! lists and documents on decode.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;
use chrono::{DateTime, TimeZone, Utc};

use crate::analysis::token::AnalyzedTerm;
use crate::document::{Document, DocumentId};
use crate::error::{DocseekError, Result};
use crate::index::posting::{Posting, PostingList};
use crate::storage::structured::{StructReader, StructWriter};
use crate::storage::{StorageInput, StorageOutput};

/// Magic bytes at the start of every snapshot file.
pub const MAGIC: &[u8; 4] = b"DSEK";

/// Version of the snapshot file layout.
pub const FORMAT_VERSION: u32 = 1;

/// A stored document together with the unique terms indexed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub document: Document,
    /// Sorted unique terms of the body.
    pub terms: Vec<String>,
}

/// An immutable, point-in-time view of the index.
#[derive(Debug, Clone)]
pub struct Snapshot {
    version: u64,
    next_doc_id: DocumentId,
    committed_at: Option<DateTime<Utc>>,
    analyzer_signature: String,
    terms: BTreeMap<String, Arc<PostingList>>,
    documents: BTreeMap<DocumentId, Arc<StoredDocument>>,
    sources: BTreeMap<String, Vec<DocumentId>>,
}

impl Snapshot {
    /// Create the empty version-0 snapshot for an analyzer.
    pub fn empty<S: Into<String>>(analyzer_signature: S) -> Self {
        Snapshot {
            version: 0,
            next_doc_id: DocumentId(0),
            committed_at: None,
            analyzer_signature: analyzer_signature.into(),
            terms: BTreeMap::new(),
            documents: BTreeMap::new(),
            sources: BTreeMap::new(),
        }
    }

    /// Version of this snapshot. Each commit increments it by one.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The id the next added document will at least receive.
    pub fn next_doc_id(&self) -> DocumentId {
        self.next_doc_id
    }

    /// When the commit that produced this snapshot happened.
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        self.committed_at
    }

    /// Signature of the analyzer the snapshot was built with.
    pub fn analyzer_signature(&self) -> &str {
        &self.analyzer_signature
    }

    /// Number of stored documents.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Number of distinct sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Check if the snapshot holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Get the posting list of a term.
    pub fn postings(&self, term: &str) -> Option<&PostingList> {
        self.terms.get(term).map(|list| list.as_ref())
    }

    /// Number of documents containing `term`.
    pub fn doc_frequency(&self, term: &str) -> usize {
        self.postings(term).map_or(0, PostingList::len)
    }

    /// Get a stored document.
    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id).map(|stored| &stored.document)
    }

    /// Iterate over stored documents in id order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values().map(|stored| &stored.document)
    }

    /// Iterate over all document ids in ascending order.
    pub fn document_ids(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.documents.keys().copied()
    }

    /// Iterate over terms in lexicographic order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    /// Iterate over source locators in lexicographic order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Ids of the documents of a source, in ascending order.
    pub fn source_documents(&self, source: &str) -> &[DocumentId] {
        self.sources.get(source).map_or(&[], Vec::as_slice)
    }

    /// Documents of a source, in id order.
    pub fn documents_of_source(&self, source: &str) -> Vec<&Document> {
        self.source_documents(source)
            .iter()
            .filter_map(|id| self.document(*id))
            .collect()
    }

    /// Resolve the document a posting points at.
    ///
    /// A posting whose document is not stored violates the snapshot
    /// invariants and is reported as corruption.
    pub fn posting_document(&self, id: DocumentId) -> Result<&Document> {
        self.document(id).ok_or_else(|| {
            DocseekError::corrupt_snapshot(format!(
                "posting references missing document {id} in snapshot version {}",
                self.version
            ))
        })
    }

    /// Check every snapshot invariant.
    ///
    /// - every posting list is ordered, duplicate free and non-empty
    /// - every posting's document is stored and lists the term
    /// - every stored document's terms have a posting for it
    /// - the source table matches the stored documents
    /// - every id is below `next_doc_id`
    pub fn verify(&self) -> Result<()> {
        for (term, list) in &self.terms {
            list.validate(term)?;
            for posting in list.iter() {
                let stored = self.documents.get(&posting.doc_id).ok_or_else(|| {
                    DocseekError::corrupt_snapshot(format!(
                        "posting of '{term}' references missing document {}",
                        posting.doc_id
                    ))
                })?;
                if stored.terms.binary_search(term).is_err() {
                    return Err(DocseekError::corrupt_snapshot(format!(
                        "document {} does not list term '{term}'",
                        posting.doc_id
                    )));
                }
            }
        }

        let mut source_counts: AHashMap<&str, usize> = AHashMap::new();
        for (id, stored) in &self.documents {
            if *id != stored.document.id {
                return Err(DocseekError::corrupt_snapshot(format!(
                    "document stored under {id} carries id {}",
                    stored.document.id
                )));
            }
            if *id >= self.next_doc_id {
                return Err(DocseekError::corrupt_snapshot(format!(
                    "document {id} is not below next id {}",
                    self.next_doc_id
                )));
            }
            if stored.document.body.trim().is_empty() {
                return Err(DocseekError::corrupt_snapshot(format!(
                    "document {id} has a blank body"
                )));
            }
            for term in &stored.terms {
                let has_posting = self
                    .terms
                    .get(term)
                    .is_some_and(|list| list.get(*id).is_some());
                if !has_posting {
                    return Err(DocseekError::corrupt_snapshot(format!(
                        "term '{term}' of document {id} has no posting"
                    )));
                }
            }
            *source_counts
                .entry(stored.document.source.as_str())
                .or_default() += 1;
        }

        if source_counts.len() != self.sources.len() {
            return Err(DocseekError::corrupt_snapshot(
                "source table does not match stored documents",
            ));
        }
        for (source, ids) in &self.sources {
            let expected = source_counts.get(source.as_str()).copied().unwrap_or(0);
            if ids.len() != expected || ids.windows(2).any(|w| w[0] >= w[1]) {
                return Err(DocseekError::corrupt_snapshot(format!(
                    "source table entry for '{source}' is inconsistent"
                )));
            }
            for id in ids {
                if self.document(*id).is_none_or(|doc| doc.source != *source) {
                    return Err(DocseekError::corrupt_snapshot(format!(
                        "source '{source}' lists foreign document {id}"
                    )));
                }
            }
        }

        Ok(())
    }

    pub(crate) fn clear_documents(&mut self) {
        self.terms.clear();
        self.documents.clear();
        self.sources.clear();
    }

    pub(crate) fn set_commit_metadata(
        &mut self,
        version: u64,
        next_doc_id: DocumentId,
        committed_at: DateTime<Utc>,
    ) {
        self.version = version;
        self.next_doc_id = next_doc_id;
        self.committed_at = Some(committed_at);
    }

    /// Remove a document and its postings. Returns whether it was stored.
    pub(crate) fn remove_document(&mut self, id: DocumentId) -> bool {
        let Some(stored) = self.documents.remove(&id) else {
            return false;
        };

        for term in &stored.terms {
            if let Some(list) = self.terms.get_mut(term) {
                Arc::make_mut(list).remove_document(id);
                if list.is_empty() {
                    self.terms.remove(term);
                }
            }
        }

        let source = &stored.document.source;
        if let Some(ids) = self.sources.get_mut(source) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.sources.remove(source);
            }
        }

        true
    }

    /// Insert a document with its analyzed body.
    pub(crate) fn insert_document(
        &mut self,
        document: Document,
        analyzed: &[AnalyzedTerm],
    ) -> Result<()> {
        let id = document.id;
        if self.documents.contains_key(&id) {
            return Err(DocseekError::invalid_operation(format!(
                "document {id} is already stored"
            )));
        }

        let mut positions: AHashMap<&str, Vec<u32>> = AHashMap::new();
        for term in analyzed {
            positions
                .entry(term.term.as_str())
                .or_default()
                .push(term.position);
        }

        let mut terms: Vec<String> = positions.keys().map(|term| term.to_string()).collect();
        terms.sort_unstable();

        for term in &terms {
            let mut term_positions = positions.remove(term.as_str()).unwrap_or_default();
            term_positions.sort_unstable();
            term_positions.dedup();
            let list = self.terms.entry(term.clone()).or_default();
            Arc::make_mut(list).add_posting(Posting::new(id, term_positions))?;
        }

        self.sources
            .entry(document.source.clone())
            .or_default()
            .push(id);
        self.documents
            .insert(id, Arc::new(StoredDocument { document, terms }));

        Ok(())
    }

    /// Serialize the snapshot including the checksum trailer.
    pub fn encode<W: StorageOutput>(&self, mut writer: StructWriter<W>) -> Result<()> {
        writer.write_raw(MAGIC)?;
        writer.write_u32(FORMAT_VERSION)?;
        writer.write_string(&self.analyzer_signature)?;
        writer.write_u64(self.version)?;
        writer.write_u64(self.next_doc_id.value())?;
        match self.committed_at {
            Some(at) => {
                writer.write_u8(1)?;
                writer.write_i64(at.timestamp_millis())?;
            }
            None => writer.write_u8(0)?,
        }

        writer.write_varint(self.documents.len() as u64)?;
        let mut prev_id = 0u64;
        for (id, stored) in &self.documents {
            writer.write_varint(id.value() - prev_id)?;
            prev_id = id.value();

            let doc = &stored.document;
            writer.write_string(&doc.title)?;
            writer.write_string(&doc.subtitle)?;
            writer.write_string(&doc.body)?;
            writer.write_string(&doc.source)?;
        }

        writer.write_varint(self.terms.len() as u64)?;
        for (term, list) in &self.terms {
            writer.write_string(term)?;
            list.encode(&mut writer)?;
        }

        writer.close()
    }

    /// Deserialize and verify a snapshot.
    ///
    /// Every failure, including a failed invariant check, is reported as
    /// [`DocseekError::CorruptSnapshot`]; no partial snapshot is returned.
    pub fn decode<R: StorageInput>(mut reader: StructReader<R>) -> Result<Self> {
        let snapshot = Self::decode_payload(&mut reader).map_err(|e| match e {
            DocseekError::CorruptSnapshot(_) => e,
            other => DocseekError::corrupt_snapshot(other.to_string()),
        })?;
        reader.close()?;
        Ok(snapshot)
    }

    fn decode_payload<R: StorageInput>(reader: &mut StructReader<R>) -> Result<Self> {
        let magic = reader.read_raw(MAGIC.len())?;
        if magic != MAGIC {
            return Err(DocseekError::corrupt_snapshot("bad magic bytes"));
        }
        let format = reader.read_u32()?;
        if format != FORMAT_VERSION {
            return Err(DocseekError::corrupt_snapshot(format!(
                "unsupported format version {format}"
            )));
        }

        let analyzer_signature = reader.read_string()?;
        let version = reader.read_u64()?;
        let next_doc_id = DocumentId(reader.read_u64()?);
        let committed_at = match reader.read_u8()? {
            0 => None,
            1 => {
                let millis = reader.read_i64()?;
                Some(Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
                    DocseekError::corrupt_snapshot(format!("invalid commit timestamp {millis}"))
                })?)
            }
            flag => {
                return Err(DocseekError::corrupt_snapshot(format!(
                    "invalid timestamp flag {flag}"
                )));
            }
        };

        let mut snapshot = Snapshot {
            version,
            next_doc_id,
            committed_at,
            analyzer_signature,
            terms: BTreeMap::new(),
            documents: BTreeMap::new(),
            sources: BTreeMap::new(),
        };

        let document_count = reader.read_len()?;
        let mut documents = BTreeMap::new();
        let mut prev_id = 0u64;
        for index in 0..document_count {
            let delta = reader.read_varint()?;
            if index > 0 && delta == 0 {
                return Err(DocseekError::corrupt_snapshot("duplicate document id"));
            }
            let id = DocumentId(
                prev_id
                    .checked_add(delta)
                    .ok_or_else(|| DocseekError::corrupt_snapshot("document id overflow"))?,
            );
            prev_id = id.value();

            let document = Document {
                id,
                title: reader.read_string()?,
                subtitle: reader.read_string()?,
                body: reader.read_string()?,
                source: reader.read_string()?,
            };
            snapshot
                .sources
                .entry(document.source.clone())
                .or_default()
                .push(id);
            documents.insert(
                id,
                StoredDocument {
                    document,
                    terms: Vec::new(),
                },
            );
        }

        let term_count = reader.read_len()?;
        let mut prev_term: Option<String> = None;
        for _ in 0..term_count {
            let term = reader.read_string()?;
            if prev_term.as_ref().is_some_and(|prev| *prev >= term) {
                return Err(DocseekError::corrupt_snapshot(
                    "terms are not in strictly ascending order",
                ));
            }
            let list = PostingList::decode(reader)?;
            for posting in list.iter() {
                // Terms arrive in ascending order, so every term list stays sorted.
                if let Some(stored) = documents.get_mut(&posting.doc_id) {
                    stored.terms.push(term.clone());
                }
            }
            snapshot.terms.insert(term.clone(), Arc::new(list));
            prev_term = Some(term);
        }

        reader.verify_checksum()?;

        snapshot.documents = documents
            .into_iter()
            .map(|(id, stored)| (id, Arc::new(stored)))
            .collect();
        snapshot.verify()?;

        Ok(snapshot)
    }
}

/// Ordered postings of `term` in `snapshot`; empty if the term is unknown.
pub fn lookup<'a>(snapshot: &'a Snapshot, term: &str) -> &'a [Posting] {
    snapshot.postings(term).map_or(&[], PostingList::postings)
}

/// Fetch a stored document by id.
///
/// Fails with [`DocseekError::NotFound`] for an id that is not stored.
pub fn fetch_document(snapshot: &Snapshot, id: DocumentId) -> Result<Document> {
    snapshot
        .document(id)
        .cloned()
        .ok_or_else(|| DocseekError::not_found(format!("document {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::analyzer::Analyzer;
    use crate::analysis::analyzer::standard::StandardAnalyzer;
    use crate::document::NewDocument;
    use crate::storage::Storage;
    use crate::storage::memory::MemoryStorage;

    fn build_snapshot(bodies: &[(&str, &str)]) -> Snapshot {
        let analyzer = StandardAnalyzer::new().unwrap();
        let mut snapshot = Snapshot::empty(analyzer.signature());
        for (index, (source, body)) in bodies.iter().enumerate() {
            let doc = NewDocument::new(*source, *body).into_document(DocumentId(index as u64));
            let terms = analyzer.analyze_terms(body).unwrap();
            snapshot.insert_document(doc, &terms).unwrap();
        }
        snapshot.set_commit_metadata(1, DocumentId(bodies.len() as u64), Utc::now());
        snapshot
    }

    #[test]
    fn test_insert_and_lookup() {
        let snapshot = build_snapshot(&[
            ("a", "Segment event tracking API"),
            ("b", "Lytics audience segment builder"),
        ]);

        snapshot.verify().unwrap();
        assert_eq!(snapshot.document_count(), 2);
        assert_eq!(snapshot.source_count(), 2);

        let postings = lookup(&snapshot, "segment");
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].positions, vec![0]);
        assert_eq!(postings[1].positions, vec![2]);
        assert!(lookup(&snapshot, "missing").is_empty());

        assert_eq!(
            fetch_document(&snapshot, DocumentId(1)).unwrap().source,
            "b"
        );
        let err = fetch_document(&snapshot, DocumentId(9)).unwrap_err();
        assert!(matches!(err, DocseekError::NotFound(_)));
    }

    #[test]
    fn test_remove_document_drops_empty_terms() {
        let mut snapshot = build_snapshot(&[
            ("a", "Segment event tracking API"),
            ("a", "segment warehouses"),
        ]);

        assert!(snapshot.remove_document(DocumentId(0)));
        assert!(!snapshot.remove_document(DocumentId(0)));

        assert!(snapshot.postings("event").is_none());
        assert_eq!(snapshot.doc_frequency("segment"), 1);
        assert_eq!(snapshot.source_documents("a"), &[DocumentId(1)]);
        snapshot.verify().unwrap();
    }

    #[test]
    fn test_copy_on_write_shares_untouched_lists() {
        let base = build_snapshot(&[("a", "alpha beta"), ("b", "gamma")]);
        let mut next = base.clone();
        next.remove_document(DocumentId(1));

        assert!(Arc::ptr_eq(&base.terms["alpha"], &next.terms["alpha"]));
        assert_eq!(base.doc_frequency("gamma"), 1);
        assert_eq!(next.doc_frequency("gamma"), 0);
    }

    #[test]
    fn test_verify_detects_orphan_posting() {
        let mut snapshot = build_snapshot(&[("a", "alpha beta")]);
        snapshot.documents.clear();

        let err = snapshot.verify().unwrap_err();
        assert!(err.requires_rebuild());
        assert!(snapshot.posting_document(DocumentId(0)).is_err());
    }

    #[test]
    fn test_encode_decode() {
        let storage = MemoryStorage::new_default();
        let snapshot = build_snapshot(&[
            ("https://segment.com/docs/", "Segment event tracking API"),
            ("https://docs.lytics.com/", "Lytics audience segment builder"),
        ]);

        snapshot
            .encode(StructWriter::new(storage.create_output("snapshot").unwrap()))
            .unwrap();
        let decoded =
            Snapshot::decode(StructReader::new(storage.open_input("snapshot").unwrap()).unwrap())
                .unwrap();

        assert_eq!(decoded.version(), 1);
        assert_eq!(decoded.next_doc_id(), DocumentId(2));
        assert_eq!(decoded.analyzer_signature(), snapshot.analyzer_signature());
        assert_eq!(
            decoded.committed_at().map(|t| t.timestamp_millis()),
            snapshot.committed_at().map(|t| t.timestamp_millis())
        );
        assert_eq!(
            decoded.documents().collect::<Vec<_>>(),
            snapshot.documents().collect::<Vec<_>>()
        );
        assert_eq!(lookup(&decoded, "segment"), lookup(&snapshot, "segment"));
        assert_eq!(decoded.documents[&DocumentId(0)].terms, snapshot.documents[&DocumentId(0)].terms);
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let storage = MemoryStorage::new_default();
        build_snapshot(&[("a", "alpha")])
            .encode(StructWriter::new(storage.create_output("snapshot").unwrap()))
            .unwrap();

        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut storage.open_input("snapshot").unwrap(), &mut bytes)
            .unwrap();
        bytes[0] = b'X';
        storage.overwrite("snapshot", &bytes).unwrap();

        let err =
            Snapshot::decode(StructReader::new(storage.open_input("snapshot").unwrap()).unwrap())
                .unwrap_err();
        assert!(err.requires_rebuild());
    }
}
