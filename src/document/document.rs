//! Document structures stored by the index.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::passage::Passage;
use crate::error::{DocseekError, Result};

/// Identifier of a committed document.
///
/// Ids are assigned by the writer in strictly increasing order and are never
/// reused, not even after the document is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

impl DocumentId {
    /// Get the raw id value.
    pub fn value(self) -> u64 {
        self.0
    }

    /// The id following this one.
    pub fn next(self) -> DocumentId {
        DocumentId(self.0 + 1)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DocumentId {
    fn from(value: u64) -> Self {
        DocumentId(value)
    }
}

/// A committed passage. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier assigned at commit.
    pub id: DocumentId,
    /// Nearest preceding page title.
    pub title: String,
    /// Nearest preceding section heading under the title, or empty.
    pub subtitle: String,
    /// The indexed passage text.
    pub body: String,
    /// Locator of the page the passage came from.
    pub source: String,
}

impl Document {
    /// The passage triple this document was built from.
    pub fn passage(&self) -> Passage {
        Passage {
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            text: self.body.clone(),
        }
    }
}

/// A document that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub source: String,
}

impl NewDocument {
    /// Create a new document with an empty title and subtitle.
    pub fn new<S: Into<String>, B: Into<String>>(source: S, body: B) -> Self {
        NewDocument {
            title: String::new(),
            subtitle: String::new(),
            body: body.into(),
            source: source.into(),
        }
    }

    /// Build a document from an extracted passage and its page locator.
    pub fn from_passage<S: Into<String>>(passage: Passage, source: S) -> Self {
        NewDocument {
            title: passage.title,
            subtitle: passage.subtitle,
            body: passage.text,
            source: source.into(),
        }
    }

    /// Create a builder for constructing documents.
    pub fn builder<S: Into<String>>(source: S) -> DocumentBuilder {
        DocumentBuilder::new(source)
    }

    /// Check the invariants a committed document must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.body.trim().is_empty() {
            return Err(DocseekError::invalid_argument(format!(
                "document from '{}' has a blank body",
                self.source
            )));
        }
        if self.source.is_empty() {
            return Err(DocseekError::invalid_argument(
                "document has an empty source locator",
            ));
        }
        Ok(())
    }

    /// Attach an id, turning this into a committed document.
    pub fn into_document(self, id: DocumentId) -> Document {
        Document {
            id,
            title: self.title,
            subtitle: self.subtitle,
            body: self.body,
            source: self.source,
        }
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug)]
pub struct DocumentBuilder {
    document: NewDocument,
}

impl DocumentBuilder {
    /// Create a new document builder for the given source locator.
    pub fn new<S: Into<String>>(source: S) -> Self {
        DocumentBuilder {
            document: NewDocument::new(source, String::new()),
        }
    }

    /// Set the title.
    pub fn title<S: Into<String>>(mut self, title: S) -> Self {
        self.document.title = title.into();
        self
    }

    /// Set the subtitle.
    pub fn subtitle<S: Into<String>>(mut self, subtitle: S) -> Self {
        self.document.subtitle = subtitle.into();
        self
    }

    /// Set the body text.
    pub fn body<S: Into<String>>(mut self, body: S) -> Self {
        self.document.body = body.into();
        self
    }

    /// Build the document.
    pub fn build(self) -> NewDocument {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let doc = NewDocument::builder("https://segment.com/docs/")
            .title("Segment")
            .subtitle("Tracking")
            .body("Segment event tracking API")
            .build();

        assert_eq!(doc.title, "Segment");
        assert_eq!(doc.subtitle, "Tracking");
        assert!(doc.validate().is_ok());

        let committed = doc.into_document(DocumentId(3));
        assert_eq!(committed.id, DocumentId(3));
        assert_eq!(committed.passage().text, "Segment event tracking API");
    }

    #[test]
    fn test_blank_body_rejected() {
        let doc = NewDocument::new("file:///a.html", "  \n\t ");
        let err = doc.validate().unwrap_err();
        assert!(matches!(err, DocseekError::InvalidArgument(_)));

        let doc = NewDocument::new("", "text");
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_document_id_ordering() {
        let id = DocumentId(41);
        assert_eq!(id.next(), DocumentId(42));
        assert!(id < id.next());
        assert_eq!(id.to_string(), "41");
        assert_eq!(serde_json::to_string(&id).unwrap(), "41");
    }
}
