//! Facetry Core: field registry, catalog configuration, and errors.
//!
//! This crate holds everything that is fixed at startup: the catalog of
//! fields (with their facet, highlight, and query-parameter settings), the
//! sort allow-list, paging and highlighting settings, and the shared error
//! type. It has no internal Facetry dependencies.
//!
//! # Modules
//!
//! - [`error`]: Error type and Result alias
//! - [`field`]: Field definitions and facet specs
//! - [`filter`]: Sub-query bucket filter expressions
//! - [`sort`]: Sort clauses and options
//! - [`registry`]: The field registry
//! - [`config`]: TOML catalog loading and validation
//! - [`document`]: Raw index documents

pub mod config;
pub mod document;
pub mod error;
pub mod field;
pub mod filter;
pub mod registry;
pub mod sort;

// Re-export key types at crate root for convenience
pub use config::{Catalog, CatalogConfig, HighlightSettings, SearchSettings, Settings};
pub use document::RawDocument;
pub use error::{Error, Result};
pub use field::{FacetSpec, FieldDefinition, FieldRole, QueryBucket, RangeBucket};
pub use filter::FilterExpr;
pub use registry::{FieldRegistry, View, ViewConfig};
pub use sort::{SortDirection, SortOption, SortSpec, SortTerm};
