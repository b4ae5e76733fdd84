//! Passages and the fold that produces them from a page's element stream.
//!
//! Extractors turn a raw page into a flat sequence of [`Element`]s. The fold
//! tracks the most recent title and subtitle and attaches them to every
//! paragraph:
//!
//! - the title starts as [`UNTITLED_SECTION`] and persists until the next title
//! - a new title resets the subtitle to `""`
//! - a subtitle persists until replaced by another subtitle or a title
//! - blank paragraphs are discarded, all text is trimmed
//!
//! # Examples
//!
//! ```
//! use docseek::document::passage::{fold_passages, Element};
//!
//! let passages = fold_passages(vec![
//!     Element::Paragraph("Intro".into()),
//!     Element::Title("Tracking".into()),
//!     Element::Subtitle("Events".into()),
//!     Element::Paragraph("Track calls record actions.".into()),
//! ]);
//!
//! assert_eq!(passages.len(), 2);
//! assert_eq!(passages[0].title, "Untitled Section");
//! assert_eq!(passages[1].subtitle, "Events");
//! ```

use serde::{Deserialize, Serialize};

/// Title assigned to passages that precede any page title.
pub const UNTITLED_SECTION: &str = "Untitled Section";

/// A structural element of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// A top-level heading.
    Title(String),
    /// A second-level heading.
    Subtitle(String),
    /// A block of body text.
    Paragraph(String),
}

/// A unit of indexed text scoped by its nearest title and subtitle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub title: String,
    pub subtitle: String,
    pub text: String,
}

impl Passage {
    /// Create a passage from its parts.
    pub fn new<T: Into<String>, S: Into<String>, X: Into<String>>(
        title: T,
        subtitle: S,
        text: X,
    ) -> Self {
        Passage {
            title: title.into(),
            subtitle: subtitle.into(),
            text: text.into(),
        }
    }
}

/// The title and subtitle in effect at a point of the element stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionScope {
    pub title: String,
    pub subtitle: String,
}

impl Default for SectionScope {
    fn default() -> Self {
        SectionScope {
            title: UNTITLED_SECTION.to_string(),
            subtitle: String::new(),
        }
    }
}

impl SectionScope {
    /// Apply `element`, returning the passage it yields if it is a
    /// non-blank paragraph.
    pub fn advance(&mut self, element: Element) -> Option<Passage> {
        match element {
            // A heading with no text does not open a new section.
            Element::Title(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    *self = SectionScope {
                        title: text.to_string(),
                        subtitle: String::new(),
                    };
                }
                None
            }
            Element::Subtitle(text) => {
                self.subtitle = text.trim().to_string();
                None
            }
            Element::Paragraph(text) => {
                let text = text.trim();
                (!text.is_empty())
                    .then(|| Passage::new(self.title.as_str(), self.subtitle.as_str(), text))
            }
        }
    }
}

/// Fold a stream of page elements into passages.
pub fn fold_passages<I>(elements: I) -> Vec<Passage>
where
    I: IntoIterator<Item = Element>,
{
    elements
        .into_iter()
        .scan(SectionScope::default(), |scope, element| {
            Some(scope.advance(element))
        })
        .flatten()
        .collect()
}
