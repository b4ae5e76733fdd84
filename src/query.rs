//! Query parsing, scoring and evaluation.
//!
//! - [`query::Query`] - the query tree
//! - [`parser::QueryParser`] - turns a query string into a tree, routing
//!   words through the index analyzer
//! - [`scorer`] - TF-IDF scoring
//! - [`evaluator`] - evaluates a tree against a snapshot with cooperative
//!   cancellation
//! - [`engine::QueryEngine`] - parse and evaluate against the live store

pub mod engine;
pub mod evaluator;
pub mod parser;
#[allow(clippy::module_inception)]
pub mod query;
pub mod scorer;

pub use engine::QueryEngine;
pub use evaluator::{
    CancellationToken, Evaluator, ScanControl, SearchHit, evaluate, evaluate_with,
};
pub use parser::{DefaultOperator, QueryParser};
pub use query::{PhraseTerm, Query};
pub use scorer::{Scorer, TfIdfScorer};
