//! # facetry-cli
//!
//! Command-line tools for Facetry catalogs:
//! - `check` validates a catalog file and summarizes its fields, facets,
//!   and sort options
//! - `search` runs a request against a JSON document file and prints the
//!   display result as JSON
//! - `show` renders a single document for the record view

#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command, SearchArgs};
pub use commands::handle_command;
