//! Catalog configuration.
//!
//! The catalog is described by a TOML file that is loaded once at startup and
//! turned into an immutable [`Catalog`]. Loading validates everything up
//! front (duplicate keys, dangling field and parameter references, bounds), so
//! a catalog that loads successfully cannot produce "unknown field" surprises
//! at request time.
//!
//! # Example
//!
//! ```toml
//! [search]
//! default_page_size = 10
//! max_page_size = 100
//!
//! [highlight]
//! pre = "<b>"
//! post = "</b>"
//! max_snippets = 3
//!
//! [views.index]
//! title_field = "title"
//!
//! [params]
//! title_qf = "title^5 title_alt"
//!
//! [[fields]]
//! key = "title"
//! roles = ["searchable"]
//! query_params = { qf = "$title_qf" }
//!
//! [[sorts]]
//! key = "relevance"
//! clause = "score desc"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::FieldDefinition;
use crate::registry::{FieldRegistry, ViewConfig};
use crate::sort::SortOption;

// ============================================================================
// Settings
// ============================================================================

/// Paging and timeout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Page size used when a request does not specify one.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Largest page size a request may ask for.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Page sizes offered to users.
    #[serde(default = "default_page_size_options")]
    pub page_size_options: Vec<usize>,

    /// Index call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_page_size() -> usize {
    10
}

fn default_max_page_size() -> usize {
    100
}

fn default_page_size_options() -> Vec<usize> {
    vec![10, 20, 50, 100]
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            page_size_options: default_page_size_options(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Highlighting settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSettings {
    /// Marker inserted before a matched term.
    #[serde(default = "default_pre")]
    pub pre: String,

    /// Marker inserted after a matched term.
    #[serde(default = "default_post")]
    pub post: String,

    /// Maximum snippets per field.
    #[serde(default = "default_max_snippets")]
    pub max_snippets: usize,

    /// Default fragment size in characters.
    #[serde(default = "default_fragment_size")]
    pub fragment_size: usize,
}

fn default_pre() -> String {
    "<b>".to_string()
}

fn default_post() -> String {
    "</b>".to_string()
}

fn default_max_snippets() -> usize {
    3
}

fn default_fragment_size() -> usize {
    100
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            pre: default_pre(),
            post: default_post(),
            max_snippets: default_max_snippets(),
            fragment_size: default_fragment_size(),
        }
    }
}

/// Index and show view settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewsConfig {
    /// Search-results view.
    #[serde(default)]
    pub index: ViewConfig,
    /// Single-record view.
    #[serde(default)]
    pub show: ViewConfig,
}

/// Non-field settings shared by every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Paging and timeout settings.
    pub search: SearchSettings,
    /// Highlighting settings.
    pub highlight: HighlightSettings,
    /// Server-side parameter defaults, referenced as `$name`.
    pub params: BTreeMap<String, String>,
}

// ============================================================================
// CatalogConfig
// ============================================================================

/// Deserialized catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Paging and timeout settings.
    #[serde(default)]
    pub search: SearchSettings,

    /// Highlighting settings.
    #[serde(default)]
    pub highlight: HighlightSettings,

    /// View settings.
    #[serde(default)]
    pub views: ViewsConfig,

    /// Server-side parameter defaults.
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// Field definitions, in display order.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,

    /// Sort options; the first is the default.
    #[serde(default)]
    pub sorts: Vec<SortOption>,
}

impl CatalogConfig {
    /// Load a catalog file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Parse a catalog from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Build and validate the catalog.
    ///
    /// # Errors
    ///
    /// Any duplicate key, dangling reference, or out-of-range setting fails
    /// the whole catalog.
    pub fn into_catalog(self) -> Result<Catalog> {
        validate_search(&self.search)?;
        validate_highlight(&self.highlight)?;

        let mut registry = FieldRegistry::new();
        for def in self.fields {
            registry.register(def)?;
        }
        for option in self.sorts {
            registry.register_sort(option)?;
        }
        registry.set_views(self.views.index, self.views.show);
        validate_param_refs(&registry, &self.params)?;
        registry.validate()?;

        log::info!(
            "Loaded catalog: {} fields, {} sort options",
            registry.len(),
            registry.sort_options().len()
        );

        Ok(Catalog {
            registry: Arc::new(registry),
            settings: Arc::new(Settings {
                search: self.search,
                highlight: self.highlight,
                params: self.params,
            }),
        })
    }
}

fn validate_search(search: &SearchSettings) -> Result<()> {
    if search.default_page_size == 0 || search.max_page_size == 0 {
        return Err(Error::config("page sizes must be at least 1"));
    }
    if search.default_page_size > search.max_page_size {
        return Err(Error::config(format!(
            "default_page_size {} exceeds max_page_size {}",
            search.default_page_size, search.max_page_size
        )));
    }
    if let Some(bad) = search
        .page_size_options
        .iter()
        .find(|&&n| n == 0 || n > search.max_page_size)
    {
        return Err(Error::config(format!(
            "page size option {bad} is outside 1..={}",
            search.max_page_size
        )));
    }
    if search.timeout_ms == 0 {
        return Err(Error::config("timeout_ms must be at least 1"));
    }
    Ok(())
}

/// Every `$name` local parameter must name an entry in `params`.
fn validate_param_refs(
    registry: &FieldRegistry,
    params: &BTreeMap<String, String>,
) -> Result<()> {
    for def in registry.fields() {
        for (name, value) in &def.query_params {
            if let Some(param) = value.strip_prefix('$') {
                if !params.contains_key(param) {
                    return Err(Error::config(format!(
                        "field '{}' parameter '{name}' references undefined '${param}'",
                        def.key
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_highlight(highlight: &HighlightSettings) -> Result<()> {
    if highlight.max_snippets == 0 {
        return Err(Error::config("highlight.max_snippets must be at least 1"));
    }
    if highlight.fragment_size == 0 {
        return Err(Error::config("highlight.fragment_size must be at least 1"));
    }
    Ok(())
}

// ============================================================================
// Catalog
// ============================================================================

/// A validated, immutable catalog: registry plus settings.
///
/// Cheap to clone (Arc internals) and safe to share across threads.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Field registry.
    pub registry: Arc<FieldRegistry>,
    /// Shared settings.
    pub settings: Arc<Settings>,
}

impl Catalog {
    /// Load and validate a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        CatalogConfig::load(path)?.into_catalog()
    }

    /// Wrap a registry with settings, validating both.
    pub fn new(registry: FieldRegistry, settings: Settings) -> Result<Self> {
        validate_search(&settings.search)?;
        validate_highlight(&settings.highlight)?;
        validate_param_refs(&registry, &settings.params)?;
        registry.validate()?;
        Ok(Self {
            registry: Arc::new(registry),
            settings: Arc::new(settings),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
