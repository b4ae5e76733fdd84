//! The query tree.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A term of a phrase with its position relative to the first phrase term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseTerm {
    pub term: String,
    pub offset: u32,
}

impl PhraseTerm {
    pub fn new<S: Into<String>>(term: S, offset: u32) -> Self {
        PhraseTerm {
            term: term.into(),
            offset,
        }
    }
}

/// A query over analyzer-normalized terms.
///
/// Trees are immutable once built and can be shared across threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Query {
    /// Documents containing the term.
    Term(String),
    /// Documents containing the terms at their relative offsets.
    Phrase(Vec<PhraseTerm>),
    /// Documents matching every child. `Not` children subtract.
    And(Vec<Query>),
    /// Documents matching any child.
    Or(Vec<Query>),
    /// Every document not matching the child.
    Not(Box<Query>),
    /// Matches nothing.
    Empty,
}

impl Query {
    /// Create a term query.
    pub fn term<S: Into<String>>(term: S) -> Self {
        Query::Term(term.into())
    }

    /// Create a phrase query from consecutive terms.
    pub fn phrase<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms: Vec<PhraseTerm> = terms
            .into_iter()
            .enumerate()
            .map(|(offset, term)| PhraseTerm::new(term, offset as u32))
            .collect();
        if terms.len() > 1 {
            Query::Phrase(terms)
        } else {
            terms
                .into_iter()
                .next()
                .map_or(Query::Empty, |t| Query::Term(t.term))
        }
    }

    /// Create a conjunction, dropping empty children.
    pub fn and(children: Vec<Query>) -> Self {
        Self::combine(children, true)
    }

    /// Create a disjunction, dropping empty children.
    pub fn or(children: Vec<Query>) -> Self {
        Self::combine(children, false)
    }

    /// Negate a query. Negating an empty query yields an empty query.
    pub fn negate(query: Query) -> Self {
        match query {
            Query::Empty => Query::Empty,
            other => Query::Not(Box::new(other)),
        }
    }

    fn combine(children: Vec<Query>, conjunction: bool) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Query::Empty => {}
                Query::And(inner) if conjunction => flat.extend(inner),
                Query::Or(inner) if !conjunction => flat.extend(inner),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => Query::Empty,
            1 => flat.pop().unwrap_or(Query::Empty),
            _ if conjunction => Query::And(flat),
            _ => Query::Or(flat),
        }
    }

    /// Whether the query matches nothing by construction.
    pub fn is_empty(&self) -> bool {
        matches!(self, Query::Empty)
    }

    /// All terms referenced by the tree, in order of appearance.
    pub fn terms(&self) -> Vec<&str> {
        let mut terms = Vec::new();
        self.collect_terms(&mut terms);
        terms
    }

    fn collect_terms<'a>(&'a self, terms: &mut Vec<&'a str>) {
        match self {
            Query::Term(term) => terms.push(term),
            Query::Phrase(phrase) => terms.extend(phrase.iter().map(|t| t.term.as_str())),
            Query::And(children) | Query::Or(children) => {
                for child in children {
                    child.collect_terms(terms);
                }
            }
            Query::Not(inner) => inner.collect_terms(terms),
            Query::Empty => {}
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term(term) => write!(f, "{term}"),
            Query::Phrase(terms) => {
                let words: Vec<_> = terms.iter().map(|t| t.term.as_str()).collect();
                write!(f, "\"{}\"", words.join(" "))
            }
            Query::And(children) | Query::Or(children) => {
                let op = if matches!(self, Query::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                let parts: Vec<_> = children.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(op))
            }
            Query::Not(inner) => write!(f, "NOT {inner}"),
            Query::Empty => write!(f, "<empty>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_flattens_and_drops_empty() {
        let query = Query::and(vec![
            Query::term("a"),
            Query::Empty,
            Query::and(vec![Query::term("b"), Query::term("c")]),
        ]);
        assert_eq!(
            query,
            Query::And(vec![Query::term("a"), Query::term("b"), Query::term("c")])
        );

        assert_eq!(Query::or(vec![Query::Empty, Query::term("a")]), Query::term("a"));
        assert!(Query::and(vec![Query::Empty]).is_empty());
        assert!(Query::negate(Query::Empty).is_empty());
    }

    #[test]
    fn test_phrase_constructor() {
        assert_eq!(Query::phrase(["api"]), Query::term("api"));
        assert!(Query::phrase(Vec::<String>::new()).is_empty());

        let Query::Phrase(terms) = Query::phrase(["event", "tracking"]) else {
            panic!("expected phrase");
        };
        assert_eq!(terms[1], PhraseTerm::new("tracking", 1));
    }

    #[test]
    fn test_display_and_terms() {
        let query = Query::and(vec![
            Query::term("segment"),
            Query::negate(Query::phrase(["audience", "builder"])),
        ]);
        assert_eq!(query.to_string(), "(segment AND NOT \"audience builder\")");
        assert_eq!(query.terms(), vec!["segment", "audience", "builder"]);
    }
}
