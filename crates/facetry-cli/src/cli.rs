//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Facetry - faceted search over a configured catalog
#[derive(Parser, Debug)]
#[command(name = "facetry", version)]
#[command(about = "Check and query Facetry search catalogs", long_about = None)]
pub struct Cli {
    /// Catalog configuration file
    #[arg(
        short,
        long,
        env = "FACETRY_CONFIG",
        default_value = "config/catalog.toml"
    )]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the catalog and print a summary
    Check,

    /// Run a search against a JSON document file
    Search(SearchArgs),

    /// Render one document for the record view
    Show {
        /// JSON array of documents to search
        #[arg(short, long)]
        docs: PathBuf,

        /// Document identifier
        #[arg(value_name = "ID")]
        id: String,
    },
}

/// Arguments for `facetry search`.
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// JSON array of documents to search
    #[arg(short, long)]
    pub docs: PathBuf,

    /// Free-text query
    #[arg(short, long, default_value = "")]
    pub query: String,

    /// Fielded query as FIELD=TEXT (repeatable)
    #[arg(long = "field", value_name = "FIELD=TEXT", value_parser = parse_key_value)]
    pub fields: Vec<(String, String)>,

    /// Facet selection as FACET=VALUE (repeatable)
    #[arg(long = "facet", value_name = "FACET=VALUE", value_parser = parse_key_value)]
    pub facets: Vec<(String, String)>,

    /// Sort option key
    #[arg(short, long)]
    pub sort: Option<String>,

    /// 1-based page number
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,

    /// Results per page
    #[arg(long)]
    pub per_page: Option<usize>,

    /// Index timeout in milliseconds, overriding the catalog setting
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Parse `KEY=VALUE`, splitting on the first `=`.
pub fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{arg}'")),
    }
}
