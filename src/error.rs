//! Error types for the docseek library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`DocseekError`] enum. The variants follow the failure taxonomy of the
//! system: per-locator ingestion failures ([`DocseekError::Fetch`],
//! [`DocseekError::Encoding`]), user input failures
//! ([`DocseekError::MalformedQuery`]) and store failures
//! ([`DocseekError::StoreUnavailable`], [`DocseekError::CorruptSnapshot`]).
//!
//! # Examples
//!
//! ```
//! use docseek::error::{DocseekError, Result};
//!
//! fn parse_limit(raw: &str) -> Result<usize> {
//!     raw.parse()
//!         .map_err(|_| DocseekError::invalid_argument(format!("not a number: {raw}")))
//! }
//!
//! assert!(parse_limit("5").is_ok());
//! assert!(parse_limit("five").is_err());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for docseek operations.
#[derive(Error, Debug)]
pub enum DocseekError {
    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A source locator could not be fetched.
    #[error("Fetch error for {locator}: {reason}")]
    Fetch { locator: String, reason: String },

    /// Text handed to the analyzer was not valid UTF-8.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The query string could not be parsed.
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// The index store cannot be opened or used.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A snapshot violates its invariants and must be rebuilt from source.
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation cancelled
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with DocseekError.
pub type Result<T> = std::result::Result<T, DocseekError>;

impl DocseekError {
    /// Create a new fetch error.
    pub fn fetch<L: Into<String>, R: Into<String>>(locator: L, reason: R) -> Self {
        DocseekError::Fetch {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Create a new encoding error.
    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        DocseekError::Encoding(msg.into())
    }

    /// Create a new malformed query error.
    pub fn malformed_query<S: Into<String>>(msg: S) -> Self {
        DocseekError::MalformedQuery(msg.into())
    }

    /// Create a new store unavailable error.
    pub fn store_unavailable<S: Into<String>>(msg: S) -> Self {
        DocseekError::StoreUnavailable(msg.into())
    }

    /// Create a new corrupt snapshot error.
    pub fn corrupt_snapshot<S: Into<String>>(msg: S) -> Self {
        DocseekError::CorruptSnapshot(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        DocseekError::Storage(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        DocseekError::InvalidOperation(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        DocseekError::InvalidArgument(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        DocseekError::NotFound(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        DocseekError::Cancelled(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DocseekError::Other(msg.into())
    }

    /// Whether the process holding the store can no longer serve queries.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DocseekError::StoreUnavailable(_))
    }

    /// Whether the index has to be rebuilt from source material.
    pub fn requires_rebuild(&self) -> bool {
        matches!(self, DocseekError::CorruptSnapshot(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = DocseekError::malformed_query("unbalanced parenthesis");
        assert_eq!(
            error.to_string(),
            "Malformed query: unbalanced parenthesis"
        );

        let error = DocseekError::fetch("https://docs.example.com", "HTTP 503");
        assert_eq!(
            error.to_string(),
            "Fetch error for https://docs.example.com: HTTP 503"
        );

        let error = DocseekError::store_unavailable("bad checksum");
        assert_eq!(error.to_string(), "Store unavailable: bad checksum");
    }

    #[test]
    fn test_error_classification() {
        assert!(DocseekError::store_unavailable("x").is_fatal());
        assert!(!DocseekError::corrupt_snapshot("x").is_fatal());
        assert!(DocseekError::corrupt_snapshot("x").requires_rebuild());
        assert!(!DocseekError::malformed_query("x").requires_rebuild());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let docseek_error = DocseekError::from(io_error);

        match docseek_error {
            DocseekError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }
}
