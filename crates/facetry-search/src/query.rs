//! Index queries and the query builder.
//!
//! [`QueryBuilder::build`] turns a [`SearchRequest`] into an [`IndexQuery`]:
//! a structured, index-agnostic description of what to match, filter, count,
//! highlight, sort, and return. Everything user-supplied is validated against
//! the [`FieldRegistry`] first.
//!
//! User text is never spliced into query syntax. Each query clause refers to
//! its text by parameter name (`v=$q1`) and the text itself travels in
//! [`IndexQuery::params`], the same way Solr local-parameter dereferencing
//! works. Rendering to Solr-style strings is available through
//! [`IndexQuery::query_string`] and [`IndexQuery::filter_strings`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use facetry_core::{
    Error, FacetSpec, FieldDefinition, FieldRegistry, FieldRole, FilterExpr, Result, Settings,
    SortOption, View,
};
use serde::{Deserialize, Serialize};

use crate::analysis;
use crate::request::SearchRequest;

/// Parameter holding the main query text.
pub const QUERY_PARAM: &str = "q";

// ============================================================================
// Query parts
// ============================================================================

/// A query clause. All clauses of a query must match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryClause {
    /// Search field key, or `None` for free text across all searchable fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Local parameters such as `qf` and `pf`.
    pub local_params: BTreeMap<String, String>,

    /// Name of the parameter holding the clause's text.
    pub value_param: String,
}

impl fmt::Display for QueryClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{!")?;
        for (name, value) in &self.local_params {
            if value.contains(char::is_whitespace) {
                write!(f, "{name}='{value}' ")?;
            } else {
                write!(f, "{name}={value} ")?;
            }
        }
        write!(f, "v=${}}}", self.value_param)
    }
}

/// A filter applied on top of the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterClause {
    /// Exact match on a field value.
    Term {
        /// Index field.
        field: String,
        /// Exact value.
        value: String,
    },
    /// Inclusive range with optional open ends.
    Range {
        /// Index field.
        field: String,
        /// Lower bound; `None` is unbounded.
        from: Option<String>,
        /// Upper bound; `None` is unbounded.
        to: Option<String>,
    },
    /// A sub-query bucket's declared filter.
    Expr {
        /// Facet key.
        facet: String,
        /// Bucket key.
        bucket: String,
        /// Bucket filter.
        expr: FilterExpr,
    },
}

fn range_bound(bound: Option<&String>) -> String {
    match bound {
        None => "*".to_string(),
        Some(b) if b.contains(char::is_whitespace) => format!("\"{b}\""),
        Some(b) => b.clone(),
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term { field, value } => write!(f, "{{!term f={field}}}{value}"),
            Self::Range { field, from, to } => write!(
                f,
                "{field}:[{} TO {}]",
                range_bound(from.as_ref()),
                range_bound(to.as_ref())
            ),
            Self::Expr { expr, .. } => write!(f, "{expr}"),
        }
    }
}

/// A selected facet value that produced a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetSelection {
    /// Facet key.
    pub facet: String,
    /// Selected value or bucket key.
    pub value: String,
}

/// A facet the index should count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetRequest {
    /// Facet key (also the counted index field for value and range facets).
    pub key: String,
    /// Declared facet behaviour.
    pub spec: FacetSpec,
    /// Maximum values to return for value facets (display limit + 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Minimum count for a value to be returned.
    pub min_count: u64,
}

/// A field to highlight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightField {
    /// Field key.
    pub key: String,
    /// Fragment size in characters.
    pub fragment_size: usize,
}

/// Highlighting instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRequest {
    /// Fields to highlight, in registry order.
    pub fields: Vec<HighlightField>,
    /// Marker before a matched term.
    pub pre: String,
    /// Marker after a matched term.
    pub post: String,
    /// Maximum snippets per field value.
    pub max_snippets: usize,
}

impl HighlightRequest {
    /// Highlight settings for a field, if it is highlighted.
    pub fn field(&self, key: &str) -> Option<&HighlightField> {
        self.fields.iter().find(|f| f.key == key)
    }
}

// ============================================================================
// IndexQuery
// ============================================================================

/// A fully resolved query for the index.
///
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexQuery {
    /// Query clauses; all must match. Empty matches every document.
    pub clauses: Vec<QueryClause>,

    /// Dereferenced parameters: server-side defaults plus query text.
    pub params: BTreeMap<String, String>,

    /// Plain request parameters contributed by search fields.
    pub request_params: BTreeMap<String, String>,

    /// Filter clauses, in registry facet order.
    pub filters: Vec<FilterClause>,

    /// Facet selections behind `filters`.
    pub selections: Vec<FacetSelection>,

    /// Facets to count, in registry order.
    pub facets: Vec<FacetRequest>,

    /// Highlighting instructions.
    pub highlight: HighlightRequest,

    /// Stored fields to return.
    pub return_fields: Vec<String>,

    /// Sort option; `None` when the catalog declares none.
    pub sort: Option<SortOption>,

    /// Number of hits to skip.
    pub offset: usize,

    /// Page size.
    pub limit: usize,
}

impl IndexQuery {
    /// Render the query clauses in Solr local-parameter syntax.
    pub fn query_string(&self) -> String {
        match self.clauses.as_slice() {
            [] => "*:*".to_string(),
            [single] => single.to_string(),
            many => many
                .iter()
                .map(|c| format!("_query_:\"{}\"", c.to_string().replace('"', "\\\"")))
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }

    /// Render the filter clauses.
    pub fn filter_strings(&self) -> Vec<String> {
        self.filters.iter().map(ToString::to_string).collect()
    }

    /// Distinct lowercase terms of all query text.
    pub fn query_terms(&self) -> BTreeSet<String> {
        self.clauses
            .iter()
            .filter_map(|c| self.params.get(&c.value_param))
            .flat_map(|text| analysis::terms(text))
            .collect()
    }

    /// 1-based page number.
    pub fn page(&self) -> usize {
        self.offset / self.limit.max(1) + 1
    }

    /// Whether `facet` has `value` selected.
    pub fn is_selected(&self, facet: &str, value: &str) -> bool {
        self.selections
            .iter()
            .any(|s| s.facet == facet && s.value == value)
    }
}

// ============================================================================
// QueryBuilder
// ============================================================================

/// Builds [`IndexQuery`] values from requests.
///
/// Borrows the catalog; cheap to construct per request.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    registry: &'a FieldRegistry,
    settings: &'a Settings,
}

impl<'a> QueryBuilder<'a> {
    /// Create a builder over a validated registry and settings.
    pub fn new(registry: &'a FieldRegistry, settings: &'a Settings) -> Self {
        Self { registry, settings }
    }

    /// Build the index query for a request.
    ///
    /// # Errors
    ///
    /// - `UnknownField` / `FieldRole` for field filters or facets the
    ///   catalog does not allow
    /// - `InvalidFacetValue` for undeclared bucket selections
    /// - `UnknownSortKey` for sort keys off the allow-list
    /// - `InvalidPagination` for page < 1, page size < 1, or page size above
    ///   the configured maximum
    pub fn build(&self, request: &SearchRequest) -> Result<IndexQuery> {
        let (offset, limit) = self.pagination(request)?;
        let sort = self.sort(request)?;

        let mut params = self.settings.params.clone();
        let mut request_params = BTreeMap::new();
        let clauses = self.clauses(request, &mut params, &mut request_params)?;
        let (filters, selections) = self.filters(request)?;

        let query = IndexQuery {
            clauses,
            params,
            request_params,
            filters,
            selections,
            facets: self.facet_requests(),
            highlight: self.highlight_request(),
            return_fields: self.return_fields(),
            sort,
            offset,
            limit,
        };

        log::debug!(
            "Built query: q={} fq={:?} sort={:?} offset={} limit={}",
            query.query_string(),
            query.filter_strings(),
            query.sort.as_ref().map(|s| s.key.as_str()),
            query.offset,
            query.limit
        );
        Ok(query)
    }

    fn pagination(&self, request: &SearchRequest) -> Result<(usize, usize)> {
        let max = self.settings.search.max_page_size;
        let page_size = request
            .page_size
            .unwrap_or(self.settings.search.default_page_size);

        if request.page < 1 {
            return Err(Error::pagination(format!(
                "page must be at least 1, got {}",
                request.page
            )));
        }
        if page_size < 1 {
            return Err(Error::pagination("page size must be at least 1"));
        }
        if page_size > max {
            return Err(Error::pagination(format!(
                "page size {page_size} exceeds maximum {max}"
            )));
        }
        let offset = (request.page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| Error::pagination(format!("page {} is out of range", request.page)))?;
        Ok((offset, page_size))
    }

    fn sort(&self, request: &SearchRequest) -> Result<Option<SortOption>> {
        match &request.sort {
            Some(key) => Ok(Some(self.registry.sort_option(key)?.clone())),
            None => Ok(self.registry.default_sort().cloned()),
        }
    }

    fn clauses(
        &self,
        request: &SearchRequest,
        params: &mut BTreeMap<String, String>,
        request_params: &mut BTreeMap<String, String>,
    ) -> Result<Vec<QueryClause>> {
        let mut filters = Vec::new();
        for filter in &request.field_filters {
            let def = self
                .registry
                .require_role(&filter.field, FieldRole::Searchable)?;
            if filter.value.trim().is_empty() {
                log::debug!("Ignoring empty fielded query on '{}'", filter.field);
                continue;
            }
            filters.push((def, filter.value.trim()));
        }

        let text = request.query.trim();
        let mut clauses = Vec::new();

        if text.is_empty() && filters.len() == 1 {
            let (def, value) = filters[0];
            params.insert(QUERY_PARAM.to_string(), value.to_string());
            request_params.extend(def.request_params.clone());
            clauses.push(fielded_clause(def, QUERY_PARAM));
            return Ok(clauses);
        }

        if !text.is_empty() {
            params.insert(QUERY_PARAM.to_string(), text.to_string());
            clauses.push(self.free_text_clause());
        }
        for (i, (def, value)) in filters.into_iter().enumerate() {
            let name = format!("{QUERY_PARAM}{}", i + 1);
            params.insert(name.clone(), value.to_string());
            request_params.extend(def.request_params.clone());
            clauses.push(fielded_clause(def, &name));
        }
        Ok(clauses)
    }

    fn free_text_clause(&self) -> QueryClause {
        let qf: Vec<&str> = self
            .registry
            .fields_with_role(FieldRole::Searchable)
            .map(|def| {
                def.query_params
                    .get("qf")
                    .map(String::as_str)
                    .unwrap_or(def.key.as_str())
            })
            .collect();
        QueryClause {
            field: None,
            local_params: BTreeMap::from([("qf".to_string(), qf.join(" "))]),
            value_param: QUERY_PARAM.to_string(),
        }
    }

    fn filters(&self, request: &SearchRequest) -> Result<(Vec<FilterClause>, Vec<FacetSelection>)> {
        // Reject unknown or non-facetable keys before emitting anything.
        for key in request.facets.keys() {
            self.registry.facet(key)?;
        }

        let mut filters = Vec::new();
        let mut selections = Vec::new();
        for def in self.registry.fields_with_role(FieldRole::Facetable) {
            let Some(values) = request.facets.get(&def.key) else {
                continue;
            };
            let (_, spec) = self.registry.facet(&def.key)?;
            for value in values {
                filters.push(filter_for(&def.key, spec, value)?);
                selections.push(FacetSelection {
                    facet: def.key.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok((filters, selections))
    }

    fn facet_requests(&self) -> Vec<FacetRequest> {
        self.registry
            .fields_with_role(FieldRole::Facetable)
            .filter_map(|def| {
                let spec = def.facet.as_ref()?;
                let (limit, min_count) = match spec {
                    FacetSpec::Value {
                        limit,
                        min_count,
                        always_show,
                    } => (
                        limit.map(|l| l + 1),
                        if *always_show { 0 } else { (*min_count).max(1) },
                    ),
                    _ => (None, 0),
                };
                Some(FacetRequest {
                    key: def.key.clone(),
                    spec: spec.clone(),
                    limit,
                    min_count,
                })
            })
            .collect()
    }

    fn highlight_request(&self) -> HighlightRequest {
        let hl = &self.settings.highlight;
        HighlightRequest {
            fields: self
                .registry
                .highlight_fields()
                .map(|def| HighlightField {
                    key: def.key.clone(),
                    fragment_size: def.fragment_size.unwrap_or(hl.fragment_size),
                })
                .collect(),
            pre: hl.pre.clone(),
            post: hl.post.clone(),
            max_snippets: hl.max_snippets,
        }
    }

    fn return_fields(&self) -> Vec<String> {
        let mut fields = vec!["id".to_string()];
        let mut push = |key: &str| {
            if !fields.iter().any(|f| f == key) {
                fields.push(key.to_string());
            }
        };
        for view in [View::Index, View::Show] {
            let cfg = self.registry.view(view);
            for key in [&cfg.title_field, &cfg.display_type_field]
                .into_iter()
                .flatten()
            {
                push(key.as_str());
            }
        }
        for def in self.registry.fields() {
            if def.has_role(FieldRole::Index) || def.has_role(FieldRole::Show) {
                push(def.key.as_str());
            }
        }
        fields
    }
}

fn fielded_clause(def: &FieldDefinition, value_param: &str) -> QueryClause {
    let mut local_params = def.query_params.clone();
    for name in ["qf", "pf"] {
        local_params
            .entry(name.to_string())
            .or_insert_with(|| def.key.clone());
    }
    QueryClause {
        field: Some(def.key.clone()),
        local_params,
        value_param: value_param.to_string(),
    }
}

fn filter_for(key: &str, spec: &FacetSpec, value: &str) -> Result<FilterClause> {
    let invalid = || Error::InvalidFacetValue {
        facet: key.to_string(),
        value: value.to_string(),
    };
    match spec {
        FacetSpec::Value { .. } => Ok(FilterClause::Term {
            field: key.to_string(),
            value: value.to_string(),
        }),
        FacetSpec::Query { buckets, .. } => {
            let bucket = buckets.iter().find(|b| b.key == value).ok_or_else(invalid)?;
            Ok(FilterClause::Expr {
                facet: key.to_string(),
                bucket: bucket.key.clone(),
                expr: bucket.filter.clone(),
            })
        }
        FacetSpec::Range { buckets, .. } => {
            let bucket = buckets.iter().find(|b| b.key == value).ok_or_else(invalid)?;
            Ok(FilterClause::Range {
                field: key.to_string(),
                from: bucket.from.clone(),
                to: bucket.to.clone(),
            })
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
