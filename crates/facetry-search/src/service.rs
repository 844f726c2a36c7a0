//! Catalog search service.
//!
//! [`CatalogSearch`] ties the pieces together for one catalog and one index:
//!
//! ```text
//! SearchRequest ──build──► IndexQuery ──backend (timeout)──► IndexResponse
//!                                                                 │
//!                              ┌──────────────────────────────────┤
//!                              ▼                                  ▼
//!                       FacetAggregator                    ResultAssembler
//!                              └───────────────joined─────────────┘
//!                                               ▼
//!                                         DisplayResult
//! ```
//!
//! The index call is the only suspending step and is bounded by a timeout.
//! Facet decoding and document assembly run on blocking tasks in parallel and
//! are joined before anything is returned; a failure in either fails the
//! whole search.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use facetry_core::{Catalog, Error, Result, View};

use crate::assemble::{DisplayDocument, DisplayResult, ResultAssembler};
use crate::backend::IndexBackend;
use crate::facets::FacetAggregator;
use crate::query::{IndexQuery, QueryBuilder};
use crate::request::SearchRequest;
use crate::response::IndexResponse;

/// Search service over one catalog and one index backend.
///
/// Cheap to clone; clones share the catalog and backend.
#[derive(Clone)]
pub struct CatalogSearch {
    catalog: Catalog,
    backend: Arc<dyn IndexBackend>,
}

impl CatalogSearch {
    /// Create a service.
    pub fn new(catalog: Catalog, backend: Arc<dyn IndexBackend>) -> Self {
        Self { catalog, backend }
    }

    /// The catalog this service searches.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The configured index timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.catalog.settings.search.timeout_ms)
    }

    /// Build the index query for a request without running it.
    pub fn build_query(&self, request: &SearchRequest) -> Result<IndexQuery> {
        QueryBuilder::new(&self.catalog.registry, &self.catalog.settings).build(request)
    }

    /// Run a search with the configured timeout.
    pub async fn search(&self, request: &SearchRequest) -> Result<DisplayResult> {
        self.search_with_timeout(request, self.timeout()).await
    }

    /// Run a search with a caller-supplied timeout.
    ///
    /// # Errors
    ///
    /// Query-building errors, `IndexTimeout` when the index does not answer
    /// in time, backend errors, and `InconsistentResponse` from assembly.
    pub async fn search_with_timeout(
        &self,
        request: &SearchRequest,
        timeout: Duration,
    ) -> Result<DisplayResult> {
        let query = Arc::new(self.build_query(request)?);
        self.ensure_ready()?;

        let response = self.bounded(timeout, self.backend.search(&query)).await?;
        log::debug!(
            "Backend '{}' returned {} of {} hits",
            self.backend.name(),
            response.hits.len(),
            response.total
        );
        self.decode(query, response).await
    }

    /// Look up one document and render it for the show view.
    ///
    /// # Errors
    ///
    /// `DocumentNotFound` when the index has no such document, plus the
    /// timeout, backend, and assembly errors of [`search`](Self::search).
    pub async fn show(&self, id: &str) -> Result<DisplayDocument> {
        self.ensure_ready()?;
        let doc = self
            .bounded(self.timeout(), self.backend.get(id))
            .await?
            .ok_or_else(|| Error::DocumentNotFound { id: id.to_string() })?;
        ResultAssembler::new(&self.catalog.registry, &self.catalog.settings)
            .render_document(&doc, View::Show)
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.backend.is_ready() {
            Ok(())
        } else {
            Err(Error::backend(format!(
                "Backend '{}' is not ready",
                self.backend.name()
            )))
        }
    }

    async fn bounded<T>(
        &self,
        timeout: Duration,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                log::warn!(
                    "Backend '{}' timed out after {millis}ms",
                    self.backend.name()
                );
                Err(Error::IndexTimeout { millis })
            }
        }
    }

    async fn decode(
        &self,
        query: Arc<IndexQuery>,
        response: IndexResponse,
    ) -> Result<DisplayResult> {
        let response = Arc::new(response);

        let facets = {
            let registry = Arc::clone(&self.catalog.registry);
            let query = Arc::clone(&query);
            let response = Arc::clone(&response);
            tokio::task::spawn_blocking(move || {
                FacetAggregator::new(&registry).decode(&response.facet_counts, &query.selections)
            })
        };
        let documents = {
            let registry = Arc::clone(&self.catalog.registry);
            let settings = Arc::clone(&self.catalog.settings);
            let query = Arc::clone(&query);
            let response = Arc::clone(&response);
            tokio::task::spawn_blocking(move || {
                ResultAssembler::new(&registry, &settings).documents(&response, &query)
            })
        };

        let (facets, documents) = futures::future::try_join(facets, documents)
            .await
            .map_err(|e| Error::backend(format!("Result decoding task failed: {e}")))?;

        Ok(DisplayResult::from_parts(
            documents?,
            facets,
            response.total,
            &query,
        ))
    }
}

impl std::fmt::Debug for CatalogSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSearch")
            .field("fields", &self.catalog.registry.len())
            .field("backend", &self.backend.name())
            .finish()
    }
}
