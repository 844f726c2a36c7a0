//! Filter expressions for sub-query facet buckets.
//!
//! Buckets such as "Full Text" or "Dataset Available" are defined by a
//! filter rather than a raw field value. The grammar is deliberately small:
//!
//! ```text
//! expr  := term (WS term)*
//! term  := ('+' | '-')? field ':' value
//! value := '*' | '"' chars '"' | bare
//! ```
//!
//! `+` (or no prefix) means the term must match, `-` means it must not. A bare
//! `*` value means "has any value". Every term must hold for a document to
//! match.
//!
//! ```rust
//! use facetry_core::FilterExpr;
//!
//! let expr: FilterExpr = "-aris:* +format:fulltext".parse().unwrap();
//! assert_eq!(expr.to_string(), "-aris:* +format:fulltext");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::RawDocument;
use crate::error::{Error, Result};

/// Whether a term is required or prohibited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// Term must match.
    Must,
    /// Term must not match.
    MustNot,
}

/// What a single term tests for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The field has at least one value.
    Present,
    /// One of the field's values equals this string exactly.
    Equals(String),
}

/// One `field:value` term of a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTerm {
    /// Required or prohibited.
    pub occur: Occur,
    /// Index field name.
    pub field: String,
    /// Test applied to the field.
    pub condition: Condition,
}

impl FilterTerm {
    fn holds(&self, doc: &RawDocument) -> bool {
        let hit = match &self.condition {
            Condition::Present => doc.has_value(&self.field),
            Condition::Equals(expected) => doc.values(&self.field).iter().any(|v| v == expected),
        };
        match self.occur {
            Occur::Must => hit,
            Occur::MustNot => !hit,
        }
    }
}

/// A parsed conjunction of filter terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilterExpr {
    terms: Vec<FilterTerm>,
}

impl FilterExpr {
    /// The parsed terms, in source order.
    pub fn terms(&self) -> &[FilterTerm] {
        &self.terms
    }

    /// Index fields referenced by this expression.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.field.as_str())
    }

    /// Evaluate the expression against a document.
    pub fn matches(&self, doc: &RawDocument) -> bool {
        self.terms.iter().all(|t| t.holds(doc))
    }
}

impl FromStr for FilterExpr {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let mut parser = Parser {
            chars: input.chars().collect(),
            pos: 0,
        };
        let mut terms = Vec::new();
        while parser.skip_whitespace() {
            terms.push(parser.term()?);
        }
        if terms.is_empty() {
            return Err(Error::parse("empty filter expression"));
        }
        Ok(Self { terms })
    }
}

impl TryFrom<String> for FilterExpr {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FilterExpr> for String {
    fn from(expr: FilterExpr) -> Self {
        expr.to_string()
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let sign = match term.occur {
                Occur::Must => '+',
                Occur::MustNot => '-',
            };
            write!(f, "{sign}{}:", term.field)?;
            match &term.condition {
                Condition::Present => f.write_str("*")?,
                Condition::Equals(v) if needs_quotes(v) => {
                    write!(f, "\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))?
                }
                Condition::Equals(v) => f.write_str(v)?,
            }
        }
        Ok(())
    }
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty() || value == "*" || value.chars().any(|c| c.is_whitespace() || c == '"')
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    /// Skips whitespace; returns whether input remains.
    fn skip_whitespace(&mut self) -> bool {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
        self.pos < self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn term(&mut self) -> Result<FilterTerm> {
        let occur = match self.peek() {
            Some('+') => {
                self.pos += 1;
                Occur::Must
            }
            Some('-') => {
                self.pos += 1;
                Occur::MustNot
            }
            _ => Occur::Must,
        };

        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let field: String = self.chars[start..self.pos].iter().collect();
        if field.is_empty() {
            return Err(Error::parse(format!(
                "expected field name at position {start}"
            )));
        }
        if self.peek() != Some(':') {
            return Err(Error::parse(format!(
                "expected ':' after field '{field}'"
            )));
        }
        self.pos += 1;

        let condition = match self.peek() {
            Some('"') => Condition::Equals(self.quoted(&field)?),
            _ => {
                let start = self.pos;
                while self.peek().is_some_and(|c| !c.is_whitespace()) {
                    self.pos += 1;
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                match value.as_str() {
                    "" => {
                        return Err(Error::parse(format!("missing value for field '{field}'")));
                    }
                    "*" => Condition::Present,
                    _ => Condition::Equals(value),
                }
            }
        };

        Ok(FilterTerm {
            occur,
            field,
            condition,
        })
    }

    fn quoted(&mut self, field: &str) -> Result<String> {
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(Error::parse(format!(
                        "unterminated quote in value for field '{field}'"
                    )));
                }
                Some('"') => {
                    self.pos += 1;
                    return Ok(value);
                }
                Some('\\') => {
                    self.pos += 1;
                    if let Some(c) = self.peek() {
                        value.push(c);
                        self.pos += 1;
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}
