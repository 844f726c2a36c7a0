//! Field definitions.
//!
//! A [`FieldDefinition`] describes one catalog field: how it is labelled, which
//! roles it plays (searchable, facetable, sortable, shown in result lists, shown
//! on the full record), whether it is highlighted, and any per-field query
//! parameter overrides. Facetable fields additionally carry a [`FacetSpec`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::FilterExpr;

/// A role a field can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    /// Free-text and fielded queries may target this field.
    Searchable,
    /// The field is offered as a facet.
    Facetable,
    /// Sort clauses may reference this field.
    Sortable,
    /// Shown in the search-results (index) view.
    Index,
    /// Shown in the single-record (show) view.
    Show,
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Searchable => write!(f, "searchable"),
            Self::Facetable => write!(f, "facetable"),
            Self::Sortable => write!(f, "sortable"),
            Self::Index => write!(f, "displayed in index"),
            Self::Show => write!(f, "displayed in show"),
        }
    }
}

/// A named sub-query bucket of a query facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryBucket {
    /// Bucket key, used as the selected facet value.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Documents matching this filter fall into the bucket.
    pub filter: FilterExpr,
}

/// A declared range bucket of a range facet. Either bound may be open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeBucket {
    /// Bucket key, used as the selected facet value.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Inclusive lower bound; `None` is unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Inclusive upper bound; `None` is unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

fn default_min_count() -> u64 {
    1
}

/// How a facetable field is counted and displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FacetSpec {
    /// Counts of distinct field values, displayed in index order.
    Value {
        /// Maximum values displayed; one extra is requested to detect "more".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
        /// Values with fewer hits are dropped.
        #[serde(default = "default_min_count")]
        min_count: u64,
        /// Keep zero-count values and empty facets.
        #[serde(default)]
        always_show: bool,
    },
    /// Declared sub-query buckets, displayed in declaration order.
    Query {
        /// Buckets in display order.
        buckets: Vec<QueryBucket>,
        /// Keep zero-count buckets and empty facets.
        #[serde(default)]
        always_show: bool,
    },
    /// Declared range buckets, displayed in declaration order.
    Range {
        /// Buckets in display order.
        buckets: Vec<RangeBucket>,
        /// Keep zero-count buckets and empty facets.
        #[serde(default)]
        always_show: bool,
    },
}

impl FacetSpec {
    /// A value facet with the default minimum count and no limit.
    pub fn value() -> Self {
        Self::Value {
            limit: None,
            min_count: default_min_count(),
            always_show: false,
        }
    }

    /// Whether zero-count items (and empty facets) are kept.
    pub fn always_show(&self) -> bool {
        match self {
            Self::Value { always_show, .. }
            | Self::Query { always_show, .. }
            | Self::Range { always_show, .. } => *always_show,
        }
    }

    /// Declared bucket keys in order; empty for value facets.
    pub fn bucket_keys(&self) -> Vec<&str> {
        match self {
            Self::Value { .. } => Vec::new(),
            Self::Query { buckets, .. } => buckets.iter().map(|b| b.key.as_str()).collect(),
            Self::Range { buckets, .. } => buckets.iter().map(|b| b.key.as_str()).collect(),
        }
    }

    /// Label of a declared bucket.
    pub fn bucket_label(&self, key: &str) -> Option<&str> {
        match self {
            Self::Value { .. } => None,
            Self::Query { buckets, .. } => buckets
                .iter()
                .find(|b| b.key == key)
                .map(|b| b.label.as_str()),
            Self::Range { buckets, .. } => buckets
                .iter()
                .find(|b| b.key == key)
                .map(|b| b.label.as_str()),
        }
    }
}

/// Definition of one catalog field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Unique field key; also the index field name.
    pub key: String,

    /// Display label. Derived from the key when left empty.
    #[serde(default)]
    pub label: String,

    /// Roles this field plays.
    #[serde(default)]
    pub roles: BTreeSet<FieldRole>,

    /// Whether snippets are highlighted for this field.
    #[serde(default)]
    pub highlight: bool,

    /// Documents lacking this field cannot be displayed.
    #[serde(default)]
    pub required: bool,

    /// Local parameters for fielded queries (e.g. `qf = "$title_qf"`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, String>,

    /// Plain request parameters sent alongside fielded queries.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_params: BTreeMap<String, String>,

    /// Highlight fragment size override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_size: Option<usize>,

    /// Length of the raw-value fallback when nothing was highlighted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_max_length: Option<usize>,

    /// Facet behaviour, for facetable fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facet: Option<FacetSpec>,
}

impl FieldDefinition {
    /// Create a field with no roles.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            roles: BTreeSet::new(),
            highlight: false,
            required: false,
            query_params: BTreeMap::new(),
            request_params: BTreeMap::new(),
            fragment_size: None,
            alternate_max_length: None,
            facet: None,
        }
    }

    /// Add a role.
    pub fn with_role(mut self, role: FieldRole) -> Self {
        self.roles.insert(role);
        self
    }

    /// Enable highlighting.
    pub fn highlighted(mut self) -> Self {
        self.highlight = true;
        self
    }

    /// Mark the field mandatory for display.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Add a local query parameter override.
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    /// Add a plain request parameter.
    pub fn with_request_param(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.request_params.insert(name.into(), value.into());
        self
    }

    /// Set the highlight fragment size.
    pub fn with_fragment_size(mut self, size: usize) -> Self {
        self.fragment_size = Some(size);
        self
    }

    /// Set the fallback length used when nothing was highlighted.
    pub fn with_alternate_max_length(mut self, length: usize) -> Self {
        self.alternate_max_length = Some(length);
        self
    }

    /// Make the field facetable with the given spec.
    pub fn with_facet(mut self, spec: FacetSpec) -> Self {
        self.roles.insert(FieldRole::Facetable);
        self.facet = Some(spec);
        self
    }

    /// Whether the field plays `role`.
    pub fn has_role(&self, role: FieldRole) -> bool {
        self.roles.contains(&role)
    }
}

/// Derive a display label from a field key: `journal_name` → `Journal Name`.
pub fn label_from_key(key: &str) -> String {
    key.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
