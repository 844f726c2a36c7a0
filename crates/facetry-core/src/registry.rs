//! Field registry.
//!
//! The [`FieldRegistry`] is the catalog's single source of truth for fields,
//! facets, sort options, and view settings. It is populated once at startup,
//! validated, and then shared read-only (typically behind an `Arc`).
//!
//! Registration order is display order: facets, result-list fields, and
//! record fields are always presented in the order they were registered.
//!
//! ```rust
//! use facetry_core::{FieldDefinition, FieldRegistry, FieldRole};
//!
//! let mut registry = FieldRegistry::new();
//! registry
//!     .register(FieldDefinition::new("author", "Author").with_role(FieldRole::Index))
//!     .unwrap();
//! registry
//!     .register(FieldDefinition::new("issn", "ISSN").with_role(FieldRole::Index))
//!     .unwrap();
//!
//! let keys: Vec<_> = registry
//!     .fields_with_role(FieldRole::Index)
//!     .map(|f| f.key.as_str())
//!     .collect();
//! assert_eq!(keys, ["author", "issn"]);
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::{FacetSpec, FieldDefinition, FieldRole, label_from_key};
use crate::sort::{SCORE_FIELD, SortOption};

/// Which display a document is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Search-results list.
    Index,
    /// Single-record page.
    Show,
}

impl View {
    /// The field role that selects fields for this view.
    pub fn role(self) -> FieldRole {
        match self {
            Self::Index => FieldRole::Index,
            Self::Show => FieldRole::Show,
        }
    }
}

/// Per-view document settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Field holding the document title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_field: Option<String>,
    /// Field holding the document's display type (e.g. `format`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type_field: Option<String>,
}

/// Registry of catalog fields and sort options.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<FieldDefinition>,
    by_key: HashMap<String, usize>,
    sorts: Vec<SortOption>,
    index_view: ViewConfig,
    show_view: ViewConfig,
}

impl FieldRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateField` if the key is already registered, or `Config`
    /// if the key is empty.
    pub fn register(&mut self, mut def: FieldDefinition) -> Result<()> {
        if def.key.trim().is_empty() {
            return Err(Error::config("field key must not be empty"));
        }
        if self.by_key.contains_key(&def.key) {
            return Err(Error::DuplicateField { key: def.key });
        }
        if def.label.is_empty() {
            def.label = label_from_key(&def.key);
        }
        self.by_key.insert(def.key.clone(), self.fields.len());
        self.fields.push(def);
        Ok(())
    }

    /// Register a sort option. The first registered option is the default.
    pub fn register_sort(&mut self, mut option: SortOption) -> Result<()> {
        if self.sorts.iter().any(|s| s.key == option.key) {
            return Err(Error::config(format!(
                "duplicate sort key '{}'",
                option.key
            )));
        }
        if option.label.is_empty() {
            option.label = option.key.clone();
        }
        self.sorts.push(option);
        Ok(())
    }

    /// Set index and show view settings.
    pub fn set_views(&mut self, index: ViewConfig, show: ViewConfig) {
        self.index_view = index;
        self.show_view = show;
    }

    /// Look up a field by key.
    pub fn lookup(&self, key: &str) -> Result<&FieldDefinition> {
        self.get(key).ok_or_else(|| Error::unknown_field(key))
    }

    /// Look up a field by key, returning `None` when absent.
    pub fn get(&self, key: &str) -> Option<&FieldDefinition> {
        self.by_key.get(key).map(|&i| &self.fields[i])
    }

    /// Look up a field and require it to play `role`.
    pub fn require_role(&self, key: &str, role: FieldRole) -> Result<&FieldDefinition> {
        let def = self.lookup(key)?;
        if def.has_role(role) {
            Ok(def)
        } else {
            Err(Error::field_role(key, role.to_string()))
        }
    }

    /// Look up a facetable field together with its facet spec.
    pub fn facet(&self, key: &str) -> Result<(&FieldDefinition, &FacetSpec)> {
        let def = self.require_role(key, FieldRole::Facetable)?;
        let spec = def
            .facet
            .as_ref()
            .ok_or_else(|| Error::field_role(key, FieldRole::Facetable.to_string()))?;
        Ok((def, spec))
    }

    /// Fields playing `role`, in registration order.
    ///
    /// The returned iterator is lazy and cheap to clone; call again (or clone
    /// before consuming) to restart from the first field.
    pub fn fields_with_role(
        &self,
        role: FieldRole,
    ) -> impl Iterator<Item = &FieldDefinition> + Clone + '_ {
        self.fields.iter().filter(move |f| f.has_role(role))
    }

    /// Highlight-enabled fields, in registration order.
    pub fn highlight_fields(&self) -> impl Iterator<Item = &FieldDefinition> + Clone + '_ {
        self.fields.iter().filter(|f| f.highlight)
    }

    /// All fields, in registration order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are registered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a sort option on the allow-list.
    pub fn sort_option(&self, key: &str) -> Result<&SortOption> {
        self.sorts
            .iter()
            .find(|s| s.key == key)
            .ok_or_else(|| Error::UnknownSortKey {
                key: key.to_string(),
            })
    }

    /// The default sort option (first registered).
    pub fn default_sort(&self) -> Option<&SortOption> {
        self.sorts.first()
    }

    /// All sort options, in registration order.
    pub fn sort_options(&self) -> &[SortOption] {
        &self.sorts
    }

    /// Settings for a view.
    pub fn view(&self, view: View) -> &ViewConfig {
        match view {
            View::Index => &self.index_view,
            View::Show => &self.show_view,
        }
    }

    /// Check cross-references between fields, facets, sorts, and views.
    ///
    /// A registry that fails validation must not be used to serve requests.
    pub fn validate(&self) -> Result<()> {
        for def in &self.fields {
            validate_field(def)?;
        }

        for view in [View::Index, View::Show] {
            let cfg = self.view(view);
            for key in [&cfg.title_field, &cfg.display_type_field]
                .into_iter()
                .flatten()
            {
                if self.get(key).is_none() {
                    return Err(Error::config(format!(
                        "{view:?} view references unregistered field '{key}'"
                    )));
                }
            }
        }

        for option in &self.sorts {
            for term in option.clause.terms() {
                if term.field == SCORE_FIELD {
                    continue;
                }
                match self.get(&term.field) {
                    Some(def) if def.has_role(FieldRole::Sortable) => {}
                    Some(_) => {
                        return Err(Error::config(format!(
                            "sort '{}' uses field '{}' which is not sortable",
                            option.key, term.field
                        )));
                    }
                    None => {
                        return Err(Error::config(format!(
                            "sort '{}' uses unregistered field '{}'",
                            option.key, term.field
                        )));
                    }
                }
            }
        }

        log::debug!(
            "Validated registry: {} fields, {} sort options",
            self.fields.len(),
            self.sorts.len()
        );
        Ok(())
    }
}

fn validate_field(def: &FieldDefinition) -> Result<()> {
    let facetable = def.has_role(FieldRole::Facetable);
    match (&def.facet, facetable) {
        (Some(_), false) => {
            return Err(Error::config(format!(
                "field '{}' has a facet spec but is not facetable",
                def.key
            )));
        }
        (None, true) => {
            return Err(Error::config(format!(
                "facetable field '{}' has no facet spec",
                def.key
            )));
        }
        _ => {}
    }

    if def.fragment_size == Some(0) || def.alternate_max_length == Some(0) {
        return Err(Error::config(format!(
            "field '{}' has a zero highlight length",
            def.key
        )));
    }

    let Some(spec) = &def.facet else {
        return Ok(());
    };
    if let FacetSpec::Value { limit: Some(0), .. } = spec {
        return Err(Error::config(format!(
            "facet '{}' has a limit of 0",
            def.key
        )));
    }
    if matches!(spec, FacetSpec::Query { .. } | FacetSpec::Range { .. }) {
        let keys = spec.bucket_keys();
        if keys.is_empty() {
            return Err(Error::config(format!(
                "facet '{}' declares no buckets",
                def.key
            )));
        }
        let mut seen = HashSet::new();
        for key in keys {
            if !seen.insert(key) {
                return Err(Error::config(format!(
                    "facet '{}' declares bucket '{key}' twice",
                    def.key
                )));
            }
        }
    }
    if let FacetSpec::Range { buckets, .. } = spec {
        if let Some(b) = buckets.iter().find(|b| b.from.is_none() && b.to.is_none()) {
            return Err(Error::config(format!(
                "range bucket '{}' of facet '{}' has no bounds",
                b.key, def.key
            )));
        }
    }
    Ok(())
}
