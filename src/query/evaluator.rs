//! Query evaluation against a snapshot.
//!
//! | node   | matches                                   | score                  |
//! |--------|-------------------------------------------|------------------------|
//! | Term   | documents with a posting                  | `sqrt(tf) * idf`       |
//! | Phrase | documents with every term at its offset   | `Σ idf * sqrt(freq)`   |
//! | And    | intersection, minus `Not` children        | sum of children        |
//! | Or     | union                                     | sum of matching children |
//! | Not    | all documents minus the child             | 0                      |
//! | Empty  | nothing                                   |                        |
//!
//! Hits are ordered by descending score, then ascending document id.
//! Evaluation polls its [`ScanControl`] between postings and stops with
//! [`DocseekError::Cancelled`] when asked to; it never mutates the snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentId};
use crate::error::{DocseekError, Result};
use crate::index::snapshot::Snapshot;
use crate::query::query::{PhraseTerm, Query};
use crate::query::scorer::{Scorer, TfIdfScorer};

/// Number of postings scanned between two deadline checks.
const DEADLINE_POLL_INTERVAL: usize = 256;

type ScoredDocs = BTreeMap<DocumentId, f32>;

/// A shareable flag used to cancel running evaluations.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every evaluation using this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Cancellation and deadline settings of one evaluation.
#[derive(Debug, Clone, Default)]
pub struct ScanControl {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl ScanControl {
    /// No cancellation and no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel when `token` is cancelled.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Cancel once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Cancel once `timeout` has elapsed from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn check_token(&self) -> Result<()> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(DocseekError::cancelled("evaluation cancelled"));
        }
        Ok(())
    }

    fn check_deadline(&self) -> Result<()> {
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(DocseekError::cancelled("evaluation deadline exceeded"));
        }
        Ok(())
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub document: Document,
    pub score: f32,
}

/// Evaluate `query` against `snapshot` with TF-IDF scoring.
pub fn evaluate(snapshot: &Snapshot, query: &Query, limit: usize) -> Result<Vec<SearchHit>> {
    evaluate_with(snapshot, query, limit, &ScanControl::default())
}

/// Evaluate `query` against `snapshot`, honoring cancellation and deadline.
pub fn evaluate_with(
    snapshot: &Snapshot,
    query: &Query,
    limit: usize,
    control: &ScanControl,
) -> Result<Vec<SearchHit>> {
    Evaluator::new(snapshot, &TfIdfScorer, control).search(query, limit)
}

/// Evaluates query trees against one snapshot.
pub struct Evaluator<'a> {
    snapshot: &'a Snapshot,
    scorer: &'a dyn Scorer,
    control: &'a ScanControl,
    scanned: usize,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator.
    pub fn new(snapshot: &'a Snapshot, scorer: &'a dyn Scorer, control: &'a ScanControl) -> Self {
        Evaluator {
            snapshot,
            scorer,
            control,
            scanned: 0,
        }
    }

    /// Evaluate `query` and return at most `limit` hits.
    pub fn search(&mut self, query: &Query, limit: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.control.check_token()?;
        self.control.check_deadline()?;

        let scored = self.eval(query)?;
        let matched = scored.len();

        let mut ranked: Vec<(DocumentId, f32)> = scored.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);

        let hits = ranked
            .into_iter()
            .map(|(id, score)| {
                Ok(SearchHit {
                    document: self.snapshot.posting_document(id)?.clone(),
                    score,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Evaluated {query} on version {}: {matched} matches, {} postings scanned",
            self.snapshot.version(),
            self.scanned
        );
        Ok(hits)
    }

    fn poll(&mut self) -> Result<()> {
        self.scanned += 1;
        self.control.check_token()?;
        if self.scanned % DEADLINE_POLL_INTERVAL == 0 {
            self.control.check_deadline()?;
        }
        Ok(())
    }

    fn idf(&self, term: &str) -> f32 {
        self.scorer.idf(
            self.snapshot.doc_frequency(term),
            self.snapshot.document_count(),
        )
    }

    fn eval(&mut self, query: &Query) -> Result<ScoredDocs> {
        match query {
            Query::Term(term) => self.eval_term(term),
            Query::Phrase(terms) => self.eval_phrase(terms),
            Query::And(children) => self.eval_and(children),
            Query::Or(children) => self.eval_or(children),
            Query::Not(inner) => {
                let excluded = self.eval(inner)?;
                self.complement(&excluded)
            }
            Query::Empty => Ok(ScoredDocs::new()),
        }
    }

    fn eval_term(&mut self, term: &str) -> Result<ScoredDocs> {
        let mut scored = ScoredDocs::new();
        let Some(list) = self.snapshot.postings(term) else {
            return Ok(scored);
        };

        let idf = self.idf(term);
        for posting in list.iter() {
            self.poll()?;
            scored.insert(
                posting.doc_id,
                self.scorer.term_score(posting.frequency(), idf),
            );
        }
        Ok(scored)
    }

    fn eval_phrase(&mut self, terms: &[PhraseTerm]) -> Result<ScoredDocs> {
        let mut scored = ScoredDocs::new();
        let mut lists = Vec::with_capacity(terms.len());
        for phrase_term in terms {
            match self.snapshot.postings(&phrase_term.term) {
                Some(list) => lists.push((list, phrase_term.offset)),
                None => return Ok(scored),
            }
        }
        let Some(((anchor, anchor_offset), rest)) = lists.split_first() else {
            return Ok(scored);
        };

        let idf_sum: f32 = terms.iter().map(|t| self.idf(&t.term)).sum();

        'docs: for posting in anchor.iter() {
            self.poll()?;

            let mut others = Vec::with_capacity(rest.len());
            for (list, offset) in rest {
                match list.get(posting.doc_id) {
                    Some(other) => others.push((other, *offset)),
                    None => continue 'docs,
                }
            }

            let phrase_freq = posting
                .positions
                .iter()
                .filter(|&&position| {
                    position >= *anchor_offset
                        && others.iter().all(|(other, offset)| {
                            other.has_position(position - anchor_offset + offset)
                        })
                })
                .count() as u32;

            if phrase_freq > 0 {
                scored.insert(
                    posting.doc_id,
                    self.scorer.phrase_score(phrase_freq, idf_sum),
                );
            }
        }
        Ok(scored)
    }

    fn eval_and(&mut self, children: &[Query]) -> Result<ScoredDocs> {
        let mut positives = Vec::new();
        let mut negatives = Vec::new();
        for child in children {
            match child {
                Query::Not(inner) => negatives.push(inner.as_ref()),
                other => positives.push(other),
            }
        }

        let mut result: Option<ScoredDocs> = None;
        for child in positives {
            let scored = self.eval(child)?;
            result = Some(match result {
                None => scored,
                Some(acc) => acc
                    .into_iter()
                    .filter_map(|(id, score)| scored.get(&id).map(|other| (id, score + other)))
                    .collect(),
            });
            if result.as_ref().is_some_and(ScoredDocs::is_empty) {
                return Ok(ScoredDocs::new());
            }
        }

        let mut result = match result {
            Some(result) => result,
            None => self.complement(&ScoredDocs::new())?,
        };

        for negative in negatives {
            let excluded = self.eval(negative)?;
            result.retain(|id, _| !excluded.contains_key(id));
            if result.is_empty() {
                break;
            }
        }
        Ok(result)
    }

    fn eval_or(&mut self, children: &[Query]) -> Result<ScoredDocs> {
        let mut result = ScoredDocs::new();
        for child in children {
            for (id, score) in self.eval(child)? {
                *result.entry(id).or_insert(0.0) += score;
            }
        }
        Ok(result)
    }

    fn complement(&mut self, excluded: &ScoredDocs) -> Result<ScoredDocs> {
        let mut result = ScoredDocs::new();
        for id in self.snapshot.document_ids() {
            self.poll()?;
            if !excluded.contains_key(&id) {
                result.insert(id, 0.0);
            }
        }
        Ok(result)
    }
}
