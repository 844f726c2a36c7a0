//! Index backend trait and the in-memory reference index.
//!
//! This module defines the `IndexBackend` trait that every index adapter must
//! satisfy. An adapter receives a fully built [`IndexQuery`] and returns the
//! raw [`IndexResponse`]; all display logic stays on this side of the trait.
//!
//! # Backends
//!
//! - `MemoryIndex`: Linear scan over documents held in memory. Useful for
//!   small collections, tests, and the command-line tool.
//!
//! # Example
//!
//! ```rust,ignore
//! use facetry_search::{IndexBackend, MemoryIndex};
//!
//! let index = MemoryIndex::load("demos/documents.json")?;
//! let response = index.search(&query).await?;
//! println!("Found {} documents", response.total);
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use facetry_core::sort::SCORE_FIELD;
use facetry_core::{Error, FacetSpec, RawDocument, Result, SortDirection, SortSpec};

use crate::analysis;
use crate::highlight::Highlighter;
use crate::query::{FacetRequest, FilterClause, IndexQuery, QueryClause};
use crate::response::{FacetCount, IndexResponse};

/// Abstract index backend.
///
/// # Async
///
/// `search` and `get` are async so adapters can talk to remote indexes
/// without blocking. Callers bound them with a timeout.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Execute a query and return one page of hits plus facet counts and
    /// highlighting.
    async fn search(&self, query: &IndexQuery) -> Result<IndexResponse>;

    /// Fetch a single document by ID.
    async fn get(&self, id: &str) -> Result<Option<RawDocument>>;

    /// Get the backend name for diagnostics.
    fn name(&self) -> &str;

    /// Check if the backend is ready to handle queries.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Linear-scan index over in-memory documents.
///
/// # Limitations
///
/// - O(n) per query
/// - Whole-token matching, no stemming
/// - `pf`, `mm`, and other relevance parameters are ignored
#[derive(Default)]
pub struct MemoryIndex {
    documents: Vec<RawDocument>,
}

impl MemoryIndex {
    /// Create an index over documents, kept in the given order.
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self { documents }
    }

    /// Load documents from a JSON array.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let documents: Vec<RawDocument> = serde_json::from_str(json)?;
        Ok(Self::new(documents))
    }

    /// Load documents from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let index = Self::from_json_str(&content)
            .map_err(|e| Error::backend(format!("Failed to load {}: {e}", path.display())))?;
        log::info!(
            "Loaded {} documents from {}",
            index.documents.len(),
            path.display()
        );
        Ok(index)
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn execute(&self, query: &IndexQuery) -> IndexResponse {
        let clauses: Vec<ResolvedClause> = query
            .clauses
            .iter()
            .map(|c| ResolvedClause::new(c, &query.params))
            .collect();

        let mut matched: Vec<(&RawDocument, usize)> = self
            .documents
            .iter()
            .filter(|doc| query.filters.iter().all(|f| filter_matches(f, doc)))
            .filter_map(|doc| {
                clauses
                    .iter()
                    .map(|c| c.score(doc))
                    .sum::<Option<usize>>()
                    .map(|score| (doc, score))
            })
            .collect();

        let facet_counts = query
            .facets
            .iter()
            .map(|f| (f.key.clone(), count_facet(f, &matched)))
            .collect();

        if let Some(sort) = &query.sort {
            sort_hits(&mut matched, &sort.clause);
        }

        let total = u64::try_from(matched.len()).unwrap_or(u64::MAX);
        let hits: Vec<RawDocument> = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|(doc, _)| project(doc, &query.return_fields))
            .collect();

        let highlighting = highlight_hits(&hits, query);

        IndexResponse {
            total,
            hits,
            facet_counts,
            highlighting,
        }
    }
}

#[async_trait]
impl IndexBackend for MemoryIndex {
    async fn search(&self, query: &IndexQuery) -> Result<IndexResponse> {
        log::debug!(
            "MemoryIndex: q={} fq={:?} offset={} limit={}",
            query.query_string(),
            query.filter_strings(),
            query.offset,
            query.limit
        );
        Ok(self.execute(query))
    }

    async fn get(&self, id: &str) -> Result<Option<RawDocument>> {
        Ok(self.documents.iter().find(|d| d.id == id).cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIndex")
            .field("documents", &self.documents.len())
            .finish()
    }
}

// ============================================================================
// Query evaluation
// ============================================================================

/// A query clause with its field list and terms resolved.
struct ResolvedClause {
    fields: Vec<String>,
    terms: BTreeSet<String>,
}

impl ResolvedClause {
    fn new(clause: &QueryClause, params: &BTreeMap<String, String>) -> Self {
        let qf = clause
            .local_params
            .get("qf")
            .cloned()
            .or_else(|| clause.field.clone())
            .unwrap_or_default();
        let text = params
            .get(&clause.value_param)
            .map(String::as_str)
            .unwrap_or_default();
        Self {
            fields: resolve_fields(&qf, params),
            terms: analysis::terms(text),
        }
    }

    /// Number of term hits if every term occurs in some field, else `None`.
    fn score(&self, doc: &RawDocument) -> Option<usize> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for field in &self.fields {
            for value in doc.values(field) {
                for token in analysis::tokenize(&value) {
                    if let Some(term) = self.terms.get(&token.term) {
                        *counts.entry(term.as_str()).or_default() += 1;
                    }
                }
            }
        }
        (counts.len() == self.terms.len()).then(|| counts.values().sum())
    }
}

/// Expand `$name` references and strip `^boost` suffixes from a field list.
fn resolve_fields(qf: &str, params: &BTreeMap<String, String>) -> Vec<String> {
    let mut fields = Vec::new();
    for token in qf.split_whitespace() {
        match token.strip_prefix('$') {
            Some(name) => match params.get(name) {
                Some(expanded) => fields.extend(
                    expanded
                        .split_whitespace()
                        .filter(|f| !f.starts_with('$'))
                        .map(strip_boost),
                ),
                None => log::warn!("Unresolved parameter reference '${name}'"),
            },
            None => fields.push(strip_boost(token)),
        }
    }
    fields
}

fn strip_boost(field: &str) -> String {
    field.split('^').next().unwrap_or(field).to_string()
}

fn filter_matches(filter: &FilterClause, doc: &RawDocument) -> bool {
    match filter {
        FilterClause::Term { field, value } => doc.values(field).iter().any(|v| v == value),
        FilterClause::Range { field, from, to } => doc
            .values(field)
            .iter()
            .any(|v| in_range(v, from.as_deref(), to.as_deref())),
        FilterClause::Expr { expr, .. } => expr.matches(doc),
    }
}

/// Total order over stored values: numbers first, ordered numerically, then
/// everything else, ordered lexically.
fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn in_range(value: &str, from: Option<&str>, to: Option<&str>) -> bool {
    from.is_none_or(|f| compare_values(value, f) != Ordering::Less)
        && to.is_none_or(|t| compare_values(value, t) != Ordering::Greater)
}

fn count_where(matched: &[(&RawDocument, usize)], pred: impl Fn(&RawDocument) -> bool) -> u64 {
    let n = matched.iter().filter(|(doc, _)| pred(doc)).count();
    u64::try_from(n).unwrap_or(u64::MAX)
}

fn count_facet(request: &FacetRequest, matched: &[(&RawDocument, usize)]) -> Vec<FacetCount> {
    match &request.spec {
        FacetSpec::Value { .. } => {
            let mut counts: HashMap<String, u64> = HashMap::new();
            for (doc, _) in matched {
                let distinct: BTreeSet<String> = doc.values(&request.key).into_iter().collect();
                for value in distinct {
                    *counts.entry(value).or_default() += 1;
                }
            }
            let mut counts: Vec<FacetCount> = counts
                .into_iter()
                .filter(|(_, n)| *n >= request.min_count)
                .map(|(value, n)| FacetCount::new(value, n))
                .collect();
            counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
            if let Some(limit) = request.limit {
                counts.truncate(limit);
            }
            counts
        }
        // Buckets are counted independently, so overlapping buckets share
        // documents.
        FacetSpec::Query { buckets, .. } => buckets
            .iter()
            .map(|b| FacetCount::new(&b.key, count_where(matched, |doc| b.filter.matches(doc))))
            .collect(),
        FacetSpec::Range { buckets, .. } => buckets
            .iter()
            .map(|b| {
                let n = count_where(matched, |doc| {
                    doc.values(&request.key)
                        .iter()
                        .any(|v| in_range(v, b.from.as_deref(), b.to.as_deref()))
                });
                FacetCount::new(&b.key, n)
            })
            .collect(),
    }
}

/// Stable sort; documents without a sort value go last.
fn sort_hits(hits: &mut [(&RawDocument, usize)], spec: &SortSpec) {
    hits.sort_by(|(a, a_score), (b, b_score)| {
        for term in spec.terms() {
            let ord = if term.field == SCORE_FIELD {
                a_score.cmp(b_score)
            } else {
                match (a.first(&term.field), b.first(&term.field)) {
                    (Some(x), Some(y)) => compare_values(&x, &y),
                    (Some(_), None) => return Ordering::Less,
                    (None, Some(_)) => return Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            };
            let ord = match term.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn project(doc: &RawDocument, return_fields: &[String]) -> RawDocument {
    if return_fields.is_empty() {
        return doc.clone();
    }
    let mut out = RawDocument::new(doc.id.clone());
    for field in return_fields {
        if let Some(value) = doc.fields.get(field) {
            out.fields.insert(field.clone(), value.clone());
        }
    }
    out
}

fn highlight_hits(
    hits: &[RawDocument],
    query: &IndexQuery,
) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
    let terms = query.query_terms();
    let mut out = BTreeMap::new();
    if terms.is_empty() || query.highlight.fields.is_empty() {
        return out;
    }

    let hl = &query.highlight;
    let highlighter = Highlighter::new(&hl.pre, &hl.post, hl.max_snippets);
    for doc in hits {
        let mut fields = BTreeMap::new();
        for field in &hl.fields {
            let fragments: Vec<String> = doc
                .values(&field.key)
                .iter()
                .flat_map(|value| {
                    let snippets = highlighter.highlight(value, &terms, field.fragment_size);
                    if snippets.is_fallback() {
                        Vec::new()
                    } else {
                        snippets.iter().collect()
                    }
                })
                .collect();
            if !fragments.is_empty() {
                fields.insert(field.key.clone(), fragments);
            }
        }
        if !fields.is_empty() {
            out.insert(doc.id.clone(), fields);
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
