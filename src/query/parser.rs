//! Query parser for converting query strings to [`Query`] trees.
//!
//! Supported syntax:
//! - Words: `segment` (analyzed; a word that splits into several terms, like
//!   `real-time`, becomes a phrase)
//! - Phrases: `"event tracking"`
//! - Boolean operators: `segment AND lytics`, `segment OR lytics`,
//!   `segment NOT lytics`
//! - Prefix operators: `-lytics` (exclude), `+segment` (require)
//! - Parentheses: `(segment OR lytics) AND audience`
//!
//! Operators are recognised only in upper case. Juxtaposed operands are
//! joined by the parser's [`DefaultOperator`]; an explicit `AND` always binds
//! tighter than `OR`.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use docseek::analysis::analyzer::standard::StandardAnalyzer;
//! use docseek::query::parser::QueryParser;
//! use docseek::query::query::Query;
//!
//! let parser = QueryParser::new(Arc::new(StandardAnalyzer::new().unwrap()));
//! let query = parser.parse("Segment -Lytics").unwrap();
//!
//! assert_eq!(
//!     query,
//!     Query::And(vec![
//!         Query::term("segment"),
//!         Query::Not(Box::new(Query::term("lytics"))),
//!     ])
//! );
//! assert!(parser.parse("(segment").is_err());
//! ```

use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::error::{DocseekError, Result};
use crate::query::query::{PhraseTerm, Query};

/// Operator joining operands written next to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultOperator {
    #[default]
    And,
    Or,
}

/// A query parser that analyzes words with the index analyzer.
#[derive(Clone)]
pub struct QueryParser {
    analyzer: Arc<dyn Analyzer>,
    default_operator: DefaultOperator,
}

impl QueryParser {
    /// Create a new query parser joining juxtaposed operands with `AND`.
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        QueryParser {
            analyzer,
            default_operator: DefaultOperator::And,
        }
    }

    /// Set the operator used between juxtaposed operands.
    pub fn with_default_operator(mut self, operator: DefaultOperator) -> Self {
        self.default_operator = operator;
        self
    }

    /// Get the default operator.
    pub fn default_operator(&self) -> DefaultOperator {
        self.default_operator
    }

    /// Parse a query string into a query tree.
    ///
    /// Returns [`Query::Empty`] when every word was removed by the analyzer.
    pub fn parse(&self, query_str: &str) -> Result<Query> {
        let trimmed = query_str.trim();
        if trimmed.is_empty() {
            return Err(DocseekError::malformed_query("query is empty"));
        }

        let tokens = Lexer::new(trimmed).tokenize()?;
        let mut parser = TokenParser {
            tokens,
            position: 0,
            analyzer: self.analyzer.as_ref(),
            default_operator: self.default_operator,
        };
        parser.parse()
    }
}

impl std::fmt::Debug for QueryParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryParser")
            .field("analyzer", &self.analyzer.signature())
            .field("default_operator", &self.default_operator)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    LParen,
    RParen,
    And,
    Or,
    Not,
    Plus,
}

impl Token {
    fn starts_operand(&self) -> bool {
        matches!(
            self,
            Token::Word(_) | Token::Quoted(_) | Token::LParen | Token::Not | Token::Plus
        )
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(query_str: &'a str) -> Self {
        Lexer {
            chars: query_str.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(&ch) = self.chars.peek() {
            match ch {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '(' => {
                    self.chars.next();
                    tokens.push(Token::LParen);
                }
                ')' => {
                    self.chars.next();
                    tokens.push(Token::RParen);
                }
                '"' => {
                    self.chars.next();
                    tokens.push(Token::Quoted(self.consume_phrase()?));
                }
                '-' | '+' => {
                    self.chars.next();
                    match self.chars.peek() {
                        Some(next) if !next.is_whitespace() && *next != ')' => {
                            tokens.push(if ch == '-' { Token::Not } else { Token::Plus });
                        }
                        _ => {
                            return Err(DocseekError::malformed_query(format!(
                                "'{ch}' must be followed by an operand"
                            )));
                        }
                    }
                }
                _ => {
                    let word = self.consume_word();
                    tokens.push(match word.as_str() {
                        "AND" => Token::And,
                        "OR" => Token::Or,
                        "NOT" => Token::Not,
                        _ => Token::Word(word),
                    });
                }
            }
        }

        Ok(tokens)
    }

    fn consume_phrase(&mut self) -> Result<String> {
        let mut phrase = String::new();
        for ch in self.chars.by_ref() {
            if ch == '"' {
                return Ok(phrase);
            }
            phrase.push(ch);
        }
        Err(DocseekError::malformed_query("unterminated quoted phrase"))
    }

    fn consume_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            word.push(ch);
            self.chars.next();
        }
        word
    }
}

struct TokenParser<'a> {
    tokens: Vec<Token>,
    position: usize,
    analyzer: &'a dyn Analyzer,
    default_operator: DefaultOperator,
}

impl TokenParser<'_> {
    fn parse(&mut self) -> Result<Query> {
        let query = self.parse_or_expression()?;
        match self.peek() {
            None => Ok(query),
            Some(Token::RParen) => Err(DocseekError::malformed_query(
                "unbalanced closing parenthesis",
            )),
            Some(token) => Err(DocseekError::malformed_query(format!(
                "unexpected {token:?}"
            ))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn parse_or_expression(&mut self) -> Result<Query> {
        let mut operands = vec![self.parse_and_expression()?];

        while self.peek() == Some(&Token::Or) {
            self.advance();
            operands.push(self.parse_and_expression()?);
        }

        Ok(Query::or(operands))
    }

    fn parse_and_expression(&mut self) -> Result<Query> {
        // Each group is a conjunction; groups are joined by OR when the
        // default operator is OR.
        let mut groups = vec![vec![self.parse_unary()?]];

        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.advance();
                    let operand = self.parse_unary()?;
                    if let Some(group) = groups.last_mut() {
                        group.push(operand);
                    }
                }
                Some(token) if token.starts_operand() => {
                    let operand = self.parse_unary()?;
                    match self.default_operator {
                        DefaultOperator::And => {
                            if let Some(group) = groups.last_mut() {
                                group.push(operand);
                            }
                        }
                        DefaultOperator::Or => groups.push(vec![operand]),
                    }
                }
                _ => break,
            }
        }

        // A lone negated group still subtracts from the alternatives.
        let (exclusions, alternatives): (Vec<_>, Vec<_>) = groups
            .into_iter()
            .map(Query::and)
            .partition(|group| matches!(group, Query::Not(_)));
        if alternatives.is_empty() {
            return Ok(Query::and(exclusions));
        }

        let mut conjunction = vec![Query::or(alternatives)];
        conjunction.extend(exclusions);
        Ok(Query::and(conjunction))
    }

    fn parse_unary(&mut self) -> Result<Query> {
        match self.peek() {
            Some(Token::Not) => {
                self.advance();
                if !self.peek().is_some_and(Token::starts_operand) {
                    return Err(DocseekError::malformed_query("NOT without operand"));
                }
                Ok(Query::negate(self.parse_unary()?))
            }
            Some(Token::Plus) => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Query> {
        match self.advance() {
            Some(Token::LParen) => {
                if self.peek() == Some(&Token::RParen) {
                    return Err(DocseekError::malformed_query("empty parentheses"));
                }
                let inner = self.parse_or_expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(DocseekError::malformed_query(
                        "unbalanced opening parenthesis",
                    )),
                }
            }
            Some(Token::Quoted(text)) | Some(Token::Word(text)) => self.analyze(&text),
            Some(Token::And) | Some(Token::Or) => Err(DocseekError::malformed_query(
                "binary operator without left operand",
            )),
            Some(Token::RParen) => Err(DocseekError::malformed_query(
                "unbalanced closing parenthesis",
            )),
            Some(token) => Err(DocseekError::malformed_query(format!(
                "unexpected {token:?}"
            ))),
            None => Err(DocseekError::malformed_query(
                "query ends where an operand is expected",
            )),
        }
    }

    fn analyze(&self, text: &str) -> Result<Query> {
        let terms = self.analyzer.analyze_terms(text)?;
        let Some(first) = terms.first().map(|t| t.position) else {
            return Ok(Query::Empty);
        };

        if terms.len() == 1 {
            return Ok(Query::term(terms[0].term.clone()));
        }

        Ok(Query::Phrase(
            terms
                .into_iter()
                .map(|t| PhraseTerm::new(t.term, t.position - first))
                .collect(),
        ))
    }
}
