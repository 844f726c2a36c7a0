//! Common fixtures for facetry-search integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use facetry_core::{Catalog, CatalogConfig, RawDocument};
use facetry_search::{
    CatalogSearch, FacetCount, IndexBackend, IndexQuery, IndexResponse, MemoryIndex, Result,
};

/// The sample catalog shipped with the repository.
pub const CATALOG: &str = include_str!("../../../../config/catalog.toml");

/// The sample documents shipped with the repository.
pub const DOCUMENTS: &str = include_str!("../../../../demos/documents.json");

/// Parse and validate the sample catalog.
pub fn catalog() -> Catalog {
    CatalogConfig::from_toml_str(CATALOG)
        .unwrap()
        .into_catalog()
        .unwrap()
}

/// Sample documents in file order.
pub fn documents() -> Vec<RawDocument> {
    serde_json::from_str(DOCUMENTS).unwrap()
}

/// Search service over the sample catalog and documents.
pub fn memory_service() -> CatalogSearch {
    CatalogSearch::new(catalog(), Arc::new(MemoryIndex::new(documents())))
}

/// Backend that answers every query with a canned response and remembers
/// the last query it saw.
#[derive(Default)]
pub struct EchoBackend {
    response: IndexResponse,
    last_query: Mutex<Option<IndexQuery>>,
}

impl EchoBackend {
    /// Answer with `hits` (total = number of hits) and no facets.
    pub fn with_hits(hits: Vec<RawDocument>) -> Self {
        let total = hits.len() as u64;
        Self::with_response(IndexResponse {
            total,
            hits,
            ..Default::default()
        })
    }

    /// Answer with a full response.
    pub fn with_response(response: IndexResponse) -> Self {
        Self {
            response,
            last_query: Mutex::new(None),
        }
    }

    /// The most recent query received.
    pub fn last_query(&self) -> Option<IndexQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

#[async_trait]
impl IndexBackend for EchoBackend {
    async fn search(&self, query: &IndexQuery) -> Result<IndexResponse> {
        *self.last_query.lock().unwrap() = Some(query.clone());
        Ok(self.response.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<RawDocument>> {
        Ok(self.response.hits.iter().find(|d| d.id == id).cloned())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// A minimal document with the fields the sample catalog requires.
pub fn doc(id: &str) -> RawDocument {
    RawDocument::new(id)
        .with_field("title", format!("Document {id}"))
        .with_field("format", "citation")
        .with_field("author", "Smith, J.")
}

/// Facet counts for one facet, in the given order.
pub fn facet_counts(key: &str, values: &[(&str, u64)]) -> BTreeMap<String, Vec<FacetCount>> {
    BTreeMap::from([(
        key.to_string(),
        values.iter().map(|(v, n)| FacetCount::new(*v, *n)).collect(),
    )])
}
