//! Document model for documentation passages.
//!
//! - [`document::Document`] - a committed passage with its [`document::DocumentId`]
//! - [`document::NewDocument`] - an uncommitted passage handed to the writer
//! - [`passage::Passage`] and [`passage::fold_passages`] - the
//!   `(title, subtitle, text)` triples produced from a page's element stream

#[allow(clippy::module_inception)]
pub mod document;
pub mod passage;

pub use document::{Document, DocumentBuilder, DocumentId, NewDocument};
pub use passage::{Element, Passage, SectionScope, UNTITLED_SECTION, fold_passages};
