//! Raw index responses.

use std::collections::BTreeMap;

use facetry_core::RawDocument;
use serde::{Deserialize, Serialize};

/// One counted facet value (or bucket) as returned by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    /// Field value, or bucket key for query and range facets.
    pub value: String,
    /// Display label supplied by the index, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Number of matching documents.
    pub count: u64,
}

impl FacetCount {
    /// Create a count.
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            label: None,
            count,
        }
    }
}

/// What the index returned for an [`IndexQuery`](crate::IndexQuery).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexResponse {
    /// Total matching documents across all pages.
    pub total: u64,

    /// Hits of the requested page, in index order.
    #[serde(default)]
    pub hits: Vec<RawDocument>,

    /// Facet counts keyed by facet, in index order.
    #[serde(default)]
    pub facet_counts: BTreeMap<String, Vec<FacetCount>>,

    /// Highlighted fragments: document id → field → fragments.
    #[serde(default)]
    pub highlighting: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl IndexResponse {
    /// Highlighted fragments for one document field, if any.
    pub fn fragments(&self, doc_id: &str, field: &str) -> Option<&[String]> {
        self.highlighting
            .get(doc_id)?
            .get(field)
            .map(Vec::as_slice)
            .filter(|f| !f.is_empty())
    }
}
