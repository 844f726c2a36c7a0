//! Facet aggregation.
//!
//! The [`FacetAggregator`] turns raw index facet counts into display facets,
//! applying each facet's declared ordering, limits, and labels. Value facets
//! keep the index's order; query and range facets are always shown in the
//! order their buckets were declared, whatever order the index used.

use std::collections::BTreeMap;

use facetry_core::{FacetSpec, FieldDefinition, FieldRegistry, FieldRole};
use serde::{Deserialize, Serialize};

use crate::query::FacetSelection;
use crate::response::FacetCount;

/// One displayable facet value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFacetItem {
    /// Value to select (field value or bucket key).
    pub value: String,
    /// Display label.
    pub label: String,
    /// Matching documents.
    pub count: u64,
    /// Whether the request selected this value.
    pub selected: bool,
}

/// A facet ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFacet {
    /// Facet key.
    pub key: String,
    /// Facet label.
    pub label: String,
    /// Items in display order.
    pub items: Vec<DisplayFacetItem>,
    /// Whether the index had more values than the display limit.
    pub has_more: bool,
}

/// Decodes index facet counts against the registry.
#[derive(Debug, Clone, Copy)]
pub struct FacetAggregator<'a> {
    registry: &'a FieldRegistry,
}

impl<'a> FacetAggregator<'a> {
    /// Create an aggregator over a validated registry.
    pub fn new(registry: &'a FieldRegistry) -> Self {
        Self { registry }
    }

    /// Decode facet counts into display facets, in registry order.
    ///
    /// Counts for keys that are not registered facets are ignored.
    pub fn decode(
        &self,
        counts: &BTreeMap<String, Vec<FacetCount>>,
        selections: &[FacetSelection],
    ) -> Vec<DisplayFacet> {
        for key in counts.keys() {
            if self.registry.facet(key).is_err() {
                log::warn!("Ignoring counts for unregistered facet '{key}'");
            }
        }

        let empty = Vec::new();
        self.registry
            .fields_with_role(FieldRole::Facetable)
            .filter_map(|def| {
                let spec = def.facet.as_ref()?;
                let counts = counts.get(&def.key).unwrap_or(&empty);
                let selected = |value: &str| {
                    selections
                        .iter()
                        .any(|s| s.facet == def.key && s.value == value)
                };
                let (items, has_more) = match spec {
                    FacetSpec::Value {
                        limit,
                        min_count,
                        always_show,
                    } => value_items(counts, *limit, *min_count, *always_show, &selected),
                    FacetSpec::Query { .. } | FacetSpec::Range { .. } => {
                        (bucket_items(spec, counts, &selected), false)
                    }
                };
                if items.is_empty() && !spec.always_show() {
                    return None;
                }
                Some(display_facet(def, items, has_more))
            })
            .collect()
    }
}

fn display_facet(
    def: &FieldDefinition,
    items: Vec<DisplayFacetItem>,
    has_more: bool,
) -> DisplayFacet {
    DisplayFacet {
        key: def.key.clone(),
        label: def.label.clone(),
        items,
        has_more,
    }
}

fn value_items(
    counts: &[FacetCount],
    limit: Option<usize>,
    min_count: u64,
    always_show: bool,
    selected: &impl Fn(&str) -> bool,
) -> (Vec<DisplayFacetItem>, bool) {
    let threshold = if always_show { 0 } else { min_count.max(1) };
    let mut items: Vec<DisplayFacetItem> = counts
        .iter()
        .filter(|c| c.count >= threshold)
        .map(|c| DisplayFacetItem {
            value: c.value.clone(),
            label: c.label.clone().unwrap_or_else(|| c.value.clone()),
            count: c.count,
            selected: selected(&c.value),
        })
        .collect();

    let has_more = limit.is_some_and(|l| items.len() > l);
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    (items, has_more)
}

fn bucket_items(
    spec: &FacetSpec,
    counts: &[FacetCount],
    selected: &impl Fn(&str) -> bool,
) -> Vec<DisplayFacetItem> {
    spec.bucket_keys()
        .into_iter()
        .filter_map(|key| {
            let count = counts
                .iter()
                .find(|c| c.value == key)
                .map_or(0, |c| c.count);
            if count == 0 && !spec.always_show() {
                return None;
            }
            Some(DisplayFacetItem {
                value: key.to_string(),
                label: spec.bucket_label(key).unwrap_or(key).to_string(),
                count,
                selected: selected(key),
            })
        })
        .collect()
}
