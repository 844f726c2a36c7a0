//! Query building and result decoding for Facetry.
//!
//! This crate turns typed search requests into structured index queries and
//! turns raw index responses into display-ready result pages. It is
//! index-agnostic: anything implementing [`IndexBackend`] can serve queries,
//! and an in-memory [`MemoryIndex`] is included.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      facetry-search                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SearchRequest → QueryBuilder → IndexQuery                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  IndexBackend trait                                         │
//! │  └── MemoryIndex (linear scan)                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  IndexResponse → FacetAggregator  → DisplayFacet            │
//! │               → ResultAssembler  → DisplayDocument          │
//! │                  └── Highlighter (snippets and fallback)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CatalogSearch (timeout, parallel decoding, show)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use facetry_core::Catalog;
//! use facetry_search::{CatalogSearch, MemoryIndex, SearchRequest};
//!
//! let catalog = Catalog::load("config/catalog.toml")?;
//! let index = Arc::new(MemoryIndex::load("demos/documents.json")?);
//! let service = CatalogSearch::new(catalog, index);
//!
//! let request = SearchRequest::new("cover crops").with_facet("journal_name", "Agronomy");
//! let page = service.search(&request).await?;
//! println!("{} of {} documents", page.documents.len(), page.total_count);
//! ```

pub mod analysis;
pub mod assemble;
pub mod backend;
pub mod facets;
pub mod highlight;
pub mod query;
pub mod request;
pub mod response;
pub mod service;

// Re-export key types at crate root for convenience
pub use assemble::{DisplayDocument, DisplayField, DisplayResult, ResultAssembler};
pub use backend::{IndexBackend, MemoryIndex};
pub use facets::{DisplayFacet, DisplayFacetItem, FacetAggregator};
pub use highlight::{Highlighter, SnippetIter, Snippets};
pub use query::{
    FacetRequest, FacetSelection, FilterClause, HighlightField, HighlightRequest, IndexQuery,
    QueryBuilder, QueryClause,
};
pub use request::{FieldFilter, SearchRequest};
pub use response::{FacetCount, IndexResponse};
pub use service::CatalogSearch;

pub use facetry_core::{Error, Result};
