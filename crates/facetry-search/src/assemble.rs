//! Result assembly.
//!
//! The [`ResultAssembler`] turns index hits into display documents: it picks
//! the view's fields in registry order, swaps in highlighted snippets where the
//! field is highlighted, and computes paging metadata for the page.

use std::collections::BTreeSet;

use facetry_core::{
    Error, FieldDefinition, FieldRegistry, RawDocument, Result, Settings, View,
};
use serde::{Deserialize, Serialize};

use crate::facets::{DisplayFacet, FacetAggregator};
use crate::highlight::Highlighter;
use crate::query::IndexQuery;
use crate::response::IndexResponse;

/// A field ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayField {
    /// Field key.
    pub key: String,
    /// Field label.
    pub label: String,
    /// Display values; snippets for highlighted fields.
    pub values: Vec<String>,
    /// Whether `values` contain matched-term markers.
    pub highlighted: bool,
}

/// A document ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDocument {
    /// Document ID.
    pub id: String,
    /// Value of the view's title field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Value of the view's display-type field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
    /// Fields with values, in registry order.
    pub fields: Vec<DisplayField>,
}

impl DisplayDocument {
    /// A displayed field by key.
    pub fn field(&self, key: &str) -> Option<&DisplayField> {
        self.fields.iter().find(|f| f.key == key)
    }
}

/// One page of display-ready results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayResult {
    /// Documents in hit order.
    pub documents: Vec<DisplayDocument>,
    /// Facets in registry order.
    pub facets: Vec<DisplayFacet>,
    /// Total matching documents.
    pub total_count: u64,
    /// 1-based page number.
    pub current_page: usize,
    /// Number of pages.
    pub total_pages: u64,
    /// Page size.
    pub page_size: usize,
    /// Sort key applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl DisplayResult {
    /// Combine decoded documents and facets with paging metadata.
    pub fn from_parts(
        documents: Vec<DisplayDocument>,
        facets: Vec<DisplayFacet>,
        total_count: u64,
        query: &IndexQuery,
    ) -> Self {
        let limit = u64::try_from(query.limit.max(1)).unwrap_or(u64::MAX);
        Self {
            documents,
            facets,
            total_count,
            current_page: query.page(),
            total_pages: total_count.div_ceil(limit),
            page_size: query.limit,
            sort: query.sort.as_ref().map(|s| s.key.clone()),
        }
    }
}

/// Builds display documents from index responses.
#[derive(Debug, Clone)]
pub struct ResultAssembler<'a> {
    registry: &'a FieldRegistry,
    settings: &'a Settings,
    highlighter: Highlighter,
}

impl<'a> ResultAssembler<'a> {
    /// Create an assembler over a validated registry and settings.
    pub fn new(registry: &'a FieldRegistry, settings: &'a Settings) -> Self {
        Self {
            registry,
            settings,
            highlighter: Highlighter::from_settings(&settings.highlight),
        }
    }

    /// Assemble a full result page, decoding facets inline.
    ///
    /// [`CatalogSearch`](crate::CatalogSearch) does the same work with facet
    /// decoding and document assembly running concurrently.
    pub fn assemble(&self, response: &IndexResponse, query: &IndexQuery) -> Result<DisplayResult> {
        let documents = self.documents(response, query)?;
        let facets = FacetAggregator::new(self.registry)
            .decode(&response.facet_counts, &query.selections);
        Ok(DisplayResult::from_parts(
            documents,
            facets,
            response.total,
            query,
        ))
    }

    /// Display documents for the hits of a response, in hit order.
    ///
    /// # Errors
    ///
    /// `InconsistentResponse` when the index returned more hits than the
    /// query's limit, fewer total matches than hits, or a hit lacking a
    /// required field.
    pub fn documents(
        &self,
        response: &IndexResponse,
        query: &IndexQuery,
    ) -> Result<Vec<DisplayDocument>> {
        let hits = response.hits.len();
        if hits > query.limit {
            return Err(Error::inconsistent(format!(
                "index returned {hits} hits for a page of {}",
                query.limit
            )));
        }
        if u64::try_from(hits).unwrap_or(u64::MAX) > response.total {
            return Err(Error::inconsistent(format!(
                "index returned {hits} hits but a total of {}",
                response.total
            )));
        }

        let terms = query.query_terms();
        response
            .hits
            .iter()
            .map(|doc| {
                self.render(doc, View::Index, |def| {
                    self.highlighted_values(doc, def, response, &terms)
                })
            })
            .collect()
    }

    /// Render a single document for a view without highlighting.
    ///
    /// # Errors
    ///
    /// `InconsistentResponse` when the document lacks a required field of
    /// the view.
    pub fn render_document(&self, doc: &RawDocument, view: View) -> Result<DisplayDocument> {
        self.render(doc, view, |_| None)
    }

    fn render<F>(&self, doc: &RawDocument, view: View, highlight: F) -> Result<DisplayDocument>
    where
        F: Fn(&FieldDefinition) -> Option<(Vec<String>, bool)>,
    {
        let mut fields = Vec::new();
        for def in self.registry.fields_with_role(view.role()) {
            let raw = doc.values(&def.key);
            if raw.is_empty() {
                if def.required {
                    return Err(Error::inconsistent(format!(
                        "document '{}' is missing required field '{}'",
                        doc.id, def.key
                    )));
                }
                continue;
            }
            let (values, highlighted) = highlight(def).unwrap_or((raw, false));
            fields.push(DisplayField {
                key: def.key.clone(),
                label: def.label.clone(),
                values,
                highlighted,
            });
        }

        let cfg = self.registry.view(view);
        Ok(DisplayDocument {
            id: doc.id.clone(),
            title: cfg.title_field.as_deref().and_then(|f| doc.first(f)),
            display_type: cfg.display_type_field.as_deref().and_then(|f| doc.first(f)),
            fields,
        })
    }

    fn highlighted_values(
        &self,
        doc: &RawDocument,
        def: &FieldDefinition,
        response: &IndexResponse,
        terms: &BTreeSet<String>,
    ) -> Option<(Vec<String>, bool)> {
        if !def.highlight {
            return None;
        }
        if let Some(fragments) = response.fragments(&doc.id, &def.key) {
            return Some((fragments.to_vec(), true));
        }
        let fragment_size = def
            .fragment_size
            .unwrap_or(self.settings.highlight.fragment_size);
        let fallback_length = def.alternate_max_length.unwrap_or(fragment_size);
        Some(self.highlighter.highlight_values(
            &doc.values(&def.key),
            terms,
            fragment_size,
            fallback_length,
        ))
    }
}
