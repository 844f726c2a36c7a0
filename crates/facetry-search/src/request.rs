//! User-facing search requests.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A fielded query: search `value` in the logical search field `field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Searchable field key.
    pub field: String,
    /// User-entered query text.
    pub value: String,
}

/// A search request as entered by a user.
///
/// Requests are plain data; validation happens in the query builder, which
/// rejects anything the catalog does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query; empty matches everything.
    #[serde(default)]
    pub query: String,

    /// Fielded queries, in the order entered.
    #[serde(default)]
    pub field_filters: Vec<FieldFilter>,

    /// Selected facet values, keyed by facet.
    #[serde(default)]
    pub facets: BTreeMap<String, BTreeSet<String>>,

    /// Sort key; the catalog default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: usize,

    /// Page size; the catalog default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

fn default_page() -> usize {
    1
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            field_filters: Vec::new(),
            facets: BTreeMap::new(),
            sort: None,
            page: default_page(),
            page_size: None,
        }
    }
}

impl SearchRequest {
    /// A first-page request for `query`.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Add a fielded query.
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.field_filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Select a facet value.
    pub fn with_facet(mut self, facet: impl Into<String>, value: impl Into<String>) -> Self {
        self.facets
            .entry(facet.into())
            .or_default()
            .insert(value.into());
        self
    }

    /// Set the sort key.
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Set the page number.
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }
}
