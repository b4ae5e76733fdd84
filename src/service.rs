//! Request handling for a documentation-assistant front end.
//!
//! - [`resolver::SourceResolver`] - maps query keywords to documentation roots
//! - [`annotator`] - advisory entity annotation of the query
//! - [`handler::QueryService`] - annotate, resolve, ingest on demand, search
//!
//! No transport is provided; requests and responses are plain serde types.

pub mod annotator;
pub mod handler;
pub mod resolver;

pub use annotator::{Annotation, Annotator, GazetteerAnnotator, GazetteerEntry};
pub use handler::{
    NO_CONTENT_MESSAGE, NO_DOCUMENTATION_MESSAGE, QueryRequest, QueryResponse, QueryResult,
    QueryService,
};
pub use resolver::{SourceResolver, SourceRoute};
