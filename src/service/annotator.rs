//! Advisory query annotation.
//!
//! Annotations are returned to the caller next to the results. They never
//! influence which documents match.

use std::fmt::Debug;

use ahash::AHashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DocseekError, Result};

/// A span of the query recognized as an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub text: String,
    pub label: String,
}

/// Recognizes entities in a query.
pub trait Annotator: Send + Sync + Debug {
    fn annotate(&self, query: &str) -> Vec<Annotation>;
}

/// A dictionary entry of the [`GazetteerAnnotator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteerEntry {
    pub text: String,
    pub label: String,
}

impl GazetteerEntry {
    pub fn new<T: Into<String>, L: Into<String>>(text: T, label: L) -> Self {
        GazetteerEntry {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// Default gazetteer labelling the supported vendors as organizations.
pub fn default_gazetteer() -> Vec<GazetteerEntry> {
    ["Segment", "mParticle", "Lytics", "Zeotap"]
        .into_iter()
        .map(|vendor| GazetteerEntry::new(vendor, "ORG"))
        .collect()
}

/// Whole-word, case-insensitive dictionary lookup.
///
/// Matches are reported in query order, once per distinct entry, with the
/// text as written in the query.
#[derive(Debug, Clone)]
pub struct GazetteerAnnotator {
    pattern: Option<Regex>,
    labels: AHashMap<String, String>,
}

impl GazetteerAnnotator {
    pub fn new(entries: Vec<GazetteerEntry>) -> Result<Self> {
        let mut labels = AHashMap::new();
        let mut texts: Vec<String> = Vec::new();
        for entry in entries {
            let key = entry.text.trim().to_lowercase();
            if key.is_empty() || labels.contains_key(&key) {
                continue;
            }
            texts.push(regex::escape(&key));
            labels.insert(key, entry.label);
        }

        // Longer entries first so "foo bar" wins over "foo".
        texts.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let pattern = if texts.is_empty() {
            None
        } else {
            let source = format!(r"(?i)\b(?:{})\b", texts.join("|"));
            Some(Regex::new(&source).map_err(|e| {
                DocseekError::invalid_argument(format!("Invalid gazetteer: {e}"))
            })?)
        };

        Ok(GazetteerAnnotator { pattern, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Annotator for GazetteerAnnotator {
    fn annotate(&self, query: &str) -> Vec<Annotation> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };

        let mut seen = Vec::new();
        let mut annotations = Vec::new();
        for found in pattern.find_iter(query) {
            let key = found.as_str().to_lowercase();
            if seen.contains(&key) {
                continue;
            }
            if let Some(label) = self.labels.get(&key) {
                annotations.push(Annotation {
                    text: found.as_str().to_string(),
                    label: label.clone(),
                });
                seen.push(key);
            }
        }
        annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gazetteer() {
        let annotator = GazetteerAnnotator::new(default_gazetteer()).unwrap();
        let annotations =
            annotator.annotate("Can lytics read from SEGMENT? Segment and segments differ.");

        assert_eq!(
            annotations,
            vec![
                Annotation {
                    text: "lytics".into(),
                    label: "ORG".into()
                },
                Annotation {
                    text: "SEGMENT".into(),
                    label: "ORG".into()
                },
            ]
        );
    }

    #[test]
    fn test_longest_entry_wins() {
        let annotator = GazetteerAnnotator::new(vec![
            GazetteerEntry::new("data", "MISC"),
            GazetteerEntry::new("data pipeline", "PRODUCT"),
        ])
        .unwrap();

        let annotations = annotator.annotate("the mParticle data pipeline and data");
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].label, "PRODUCT");
        assert_eq!(annotations[1].text, "data");
    }

    #[test]
    fn test_empty_gazetteer() {
        let annotator = GazetteerAnnotator::new(Vec::new()).unwrap();
        assert!(annotator.is_empty());
        assert!(annotator.annotate("segment").is_empty());
    }
}
