//! Sort options.
//!
//! Each configured sort option has a key (used in requests), a label, and a
//! clause such as `score desc, date desc, title_sort asc`. Only keys on the
//! configured list can be requested.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pseudo-field for relevance score.
pub const SCORE_FIELD: &str = "score";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// One `field direction` pair of a sort clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortTerm {
    /// Index field, or [`SCORE_FIELD`].
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

/// A parsed, comma-separated sort clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SortSpec {
    terms: Vec<SortTerm>,
}

impl SortSpec {
    /// Terms in priority order.
    pub fn terms(&self) -> &[SortTerm] {
        &self.terms
    }
}

impl FromStr for SortSpec {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let mut terms = Vec::new();
        for part in input.split(',') {
            let words: Vec<&str> = part.split_whitespace().collect();
            let [field, direction] = words.as_slice() else {
                return Err(Error::parse(format!(
                    "sort term '{}' must be '<field> asc|desc'",
                    part.trim()
                )));
            };
            let direction = match direction.to_ascii_lowercase().as_str() {
                "asc" => SortDirection::Asc,
                "desc" => SortDirection::Desc,
                other => {
                    return Err(Error::parse(format!(
                        "unknown sort direction '{other}' for field '{field}'"
                    )));
                }
            };
            terms.push(SortTerm {
                field: (*field).to_string(),
                direction,
            });
        }
        Ok(Self { terms })
    }
}

impl TryFrom<String> for SortSpec {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SortSpec> for String {
    fn from(spec: SortSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .terms
            .iter()
            .map(|t| format!("{} {}", t.field, t.direction))
            .collect();
        f.write_str(&rendered.join(", "))
    }
}

/// A requestable sort option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOption {
    /// Key used in requests (e.g. `date-desc`).
    pub key: String,
    /// Display label (e.g. `newest`).
    #[serde(default)]
    pub label: String,
    /// Sort clause.
    pub clause: SortSpec,
}

impl SortOption {
    /// Create a sort option, parsing its clause.
    pub fn new(key: impl Into<String>, label: impl Into<String>, clause: &str) -> Result<Self> {
        Ok(Self {
            key: key.into(),
            label: label.into(),
            clause: clause.parse()?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_term_clause() {
        let spec: SortSpec = "score desc, date desc, title_sort asc".parse().unwrap();
        assert_eq!(spec.terms().len(), 3);
        assert_eq!(spec.terms()[0].field, SCORE_FIELD);
        assert_eq!(spec.terms()[2].direction, SortDirection::Asc);
        assert_eq!(spec.to_string(), "score desc, date desc, title_sort asc");
    }

    #[test]
    fn test_direction_is_case_insensitive() {
        let spec: SortSpec = "date DESC".parse().unwrap();
        assert_eq!(spec.terms()[0].direction, SortDirection::Desc);
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<SortSpec>().is_err());
        assert!("date".parse::<SortSpec>().is_err());
        assert!("date sideways".parse::<SortSpec>().is_err());
        assert!("date desc,".parse::<SortSpec>().is_err());
    }

    #[test]
    fn test_sort_option_from_toml() {
        let opt: SortOption =
            toml::from_str("key = \"title\"\nlabel = \"title\"\nclause = \"title_sort asc\"")
                .unwrap();
        assert_eq!(opt.clause.terms()[0].field, "title_sort");
    }
}
