//! Handler functions for CLI commands.
//!
//! Each `cmd_*` function returns the value it would print, so the handlers
//! can be tested without capturing stdout. [`handle_command`] does the
//! printing.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use facetry_core::{Catalog, FacetSpec, FieldRole, Result};
use facetry_search::{CatalogSearch, DisplayDocument, DisplayResult, MemoryIndex, SearchRequest};

use crate::cli::{Cli, Command, SearchArgs};

// ============================================================================
// Command dispatch
// ============================================================================

/// Load the catalog named on the command line and run the subcommand.
pub async fn handle_command(cli: Cli) -> Result<()> {
    let catalog = Catalog::load(&cli.config)?;
    log::info!("Loaded catalog from {}", cli.config.display());

    match cli.command {
        Command::Check => print!("{}", cmd_check(&catalog)),
        Command::Search(args) => {
            let result = cmd_search(catalog, &args).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Show { docs, id } => {
            let doc = cmd_show(catalog, &docs, &id).await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }
    Ok(())
}

// ============================================================================
// Command handlers
// ============================================================================

/// Summarize a validated catalog.
pub fn cmd_check(catalog: &Catalog) -> String {
    let registry = &catalog.registry;
    let keys = |role: FieldRole| -> String {
        registry
            .fields_with_role(role)
            .map(|f| f.key.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = String::new();
    let _ = writeln!(out, "Catalog OK: {} fields", registry.len());
    let _ = writeln!(out, "  searchable: {}", keys(FieldRole::Searchable));
    let _ = writeln!(out, "  index view: {}", keys(FieldRole::Index));
    let _ = writeln!(out, "  show view:  {}", keys(FieldRole::Show));

    let _ = writeln!(out, "Facets:");
    for def in registry.fields_with_role(FieldRole::Facetable) {
        let kind = match &def.facet {
            Some(FacetSpec::Value { .. }) => "value".to_string(),
            Some(FacetSpec::Query { buckets, .. }) => format!("query, {} buckets", buckets.len()),
            Some(FacetSpec::Range { buckets, .. }) => format!("range, {} buckets", buckets.len()),
            None => "value".to_string(),
        };
        let _ = writeln!(out, "  {} ({kind})", def.key);
    }

    let _ = writeln!(out, "Sorts:");
    let default_key = registry.default_sort().map(|s| s.key.as_str());
    for sort in registry.sort_options() {
        let marker = if Some(sort.key.as_str()) == default_key {
            " [default]"
        } else {
            ""
        };
        let _ = writeln!(out, "  {}: {}{marker}", sort.key, sort.label);
    }
    out
}

/// Run a search over the documents in `args.docs`.
pub async fn cmd_search(catalog: Catalog, args: &SearchArgs) -> Result<DisplayResult> {
    let service = memory_service(catalog, &args.docs)?;
    let request = search_request(args);
    log::debug!("Search request: {request:?}");

    match args.timeout_ms {
        Some(millis) => {
            service
                .search_with_timeout(&request, Duration::from_millis(millis))
                .await
        }
        None => service.search(&request).await,
    }
}

/// Render one document from `docs` for the show view.
pub async fn cmd_show(catalog: Catalog, docs: &Path, id: &str) -> Result<DisplayDocument> {
    memory_service(catalog, docs)?.show(id).await
}

// ============================================================================
// Helpers
// ============================================================================

fn memory_service(catalog: Catalog, docs: &Path) -> Result<CatalogSearch> {
    let index = MemoryIndex::load(docs)?;
    Ok(CatalogSearch::new(catalog, Arc::new(index)))
}

fn search_request(args: &SearchArgs) -> SearchRequest {
    let mut request = SearchRequest::new(args.query.clone()).with_page(args.page);
    for (field, value) in &args.fields {
        request = request.with_field(field, value);
    }
    for (facet, value) in &args.facets {
        request = request.with_facet(facet, value);
    }
    if let Some(sort) = &args.sort {
        request = request.with_sort(sort);
    }
    if let Some(size) = args.per_page {
        request = request.with_page_size(size);
    }
    request
}
