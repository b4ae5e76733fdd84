//! Postings and posting lists.
//!
//! A [`PostingList`] holds the postings of one term ordered by ascending
//! document id, at most one posting per document. Each [`Posting`] records
//! the strictly increasing token positions of the term inside the document;
//! the term frequency is the number of positions.

use crate::document::DocumentId;
use crate::error::{DocseekError, Result};
use crate::storage::structured::{StructReader, StructWriter};
use crate::storage::{StorageInput, StorageOutput};

/// A single posting in a posting list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Document ID.
    pub doc_id: DocumentId,
    /// Positions of the term in the document.
    pub positions: Vec<u32>,
}

impl Posting {
    /// Create a posting with positions.
    pub fn new(doc_id: DocumentId, positions: Vec<u32>) -> Self {
        Posting { doc_id, positions }
    }

    /// Get the term frequency.
    pub fn frequency(&self) -> u32 {
        self.positions.len() as u32
    }

    /// Whether the term occurs at `position`.
    pub fn has_position(&self, position: u32) -> bool {
        self.positions.binary_search(&position).is_ok()
    }

    fn validate(&self, term: &str) -> Result<()> {
        if self.positions.is_empty() {
            return Err(DocseekError::corrupt_snapshot(format!(
                "posting of '{term}' for document {} has no positions",
                self.doc_id
            )));
        }
        if self.positions.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DocseekError::corrupt_snapshot(format!(
                "positions of '{term}' in document {} are not strictly increasing",
                self.doc_id
            )));
        }
        Ok(())
    }
}

/// A posting list for a specific term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    /// Create a new empty posting list.
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
        }
    }

    /// Add a posting, keeping the list ordered by document id.
    ///
    /// Fails if the document already has a posting in this list.
    pub fn add_posting(&mut self, posting: Posting) -> Result<()> {
        // New documents always carry the highest id, so appending is the common case.
        if self
            .postings
            .last()
            .is_none_or(|last| last.doc_id < posting.doc_id)
        {
            self.postings.push(posting);
            return Ok(());
        }

        match self
            .postings
            .binary_search_by_key(&posting.doc_id, |p| p.doc_id)
        {
            Ok(_) => Err(DocseekError::invalid_operation(format!(
                "document {} already has a posting",
                posting.doc_id
            ))),
            Err(pos) => {
                self.postings.insert(pos, posting);
                Ok(())
            }
        }
    }

    /// Remove the posting of a document. Returns whether one was removed.
    pub fn remove_document(&mut self, doc_id: DocumentId) -> bool {
        match self.postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(pos) => {
                self.postings.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Get the posting of a document.
    pub fn get(&self, doc_id: DocumentId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|pos| &self.postings[pos])
    }

    /// Get the length of the posting list (the document frequency).
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Check if the posting list is empty.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Total number of occurrences across all documents.
    pub fn total_frequency(&self) -> u64 {
        self.postings.iter().map(|p| p.frequency() as u64).sum()
    }

    /// Get an iterator over the postings.
    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    /// Get the postings as a slice.
    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// Check ordering, uniqueness and per-posting invariants.
    pub fn validate(&self, term: &str) -> Result<()> {
        if self.postings.is_empty() {
            return Err(DocseekError::corrupt_snapshot(format!(
                "term '{term}' has an empty posting list"
            )));
        }
        if self.postings.windows(2).any(|w| w[0].doc_id >= w[1].doc_id) {
            return Err(DocseekError::corrupt_snapshot(format!(
                "postings of '{term}' are not ordered by unique document id"
            )));
        }
        for posting in &self.postings {
            posting.validate(term)?;
        }
        Ok(())
    }

    /// Encode the posting list: count, then per posting the delta-compressed
    /// document id followed by delta-compressed positions.
    pub fn encode<W: StorageOutput>(&self, writer: &mut StructWriter<W>) -> Result<()> {
        writer.write_varint(self.postings.len() as u64)?;

        let mut prev_doc_id = 0u64;
        for posting in &self.postings {
            writer.write_varint(posting.doc_id.value() - prev_doc_id)?;
            prev_doc_id = posting.doc_id.value();

            writer.write_delta_compressed_u32s(&posting.positions)?;
        }

        Ok(())
    }

    /// Decode a posting list written by [`PostingList::encode`].
    pub fn decode<R: StorageInput>(reader: &mut StructReader<R>) -> Result<Self> {
        let posting_count = reader.read_len()?;

        let mut postings = Vec::with_capacity(posting_count);
        let mut prev_doc_id = 0u64;

        for _ in 0..posting_count {
            let delta = reader.read_varint()?;
            let doc_id = prev_doc_id
                .checked_add(delta)
                .ok_or_else(|| DocseekError::corrupt_snapshot("document id overflow"))?;
            prev_doc_id = doc_id;

            let positions = reader.read_delta_compressed_u32s()?;
            postings.push(Posting::new(DocumentId(doc_id), positions));
        }

        Ok(PostingList { postings })
    }
}

impl<'a> IntoIterator for &'a PostingList {
    type Item = &'a Posting;
    type IntoIter = std::slice::Iter<'a, Posting>;

    fn into_iter(self) -> Self::IntoIter {
        self.postings.iter()
    }
}
