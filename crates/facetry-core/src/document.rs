//! Raw index documents.
//!
//! A [`RawDocument`] is what an index hands back for a hit: an ID plus a bag
//! of stored fields. Field values are kept as JSON so single-valued,
//! multi-valued, and numeric fields all round-trip without a schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored document as returned by the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Unique document identifier.
    pub id: String,

    /// Stored fields, keyed by index field name.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RawDocument {
    /// Create a document with no stored fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// All non-empty scalar values of a field, flattened, in stored order.
    ///
    /// `id` resolves to the document ID. Missing fields, nulls, and nested
    /// objects yield nothing.
    pub fn values(&self, field: &str) -> Vec<String> {
        if field == "id" {
            return vec![self.id.clone()];
        }
        let mut out = Vec::new();
        if let Some(value) = self.fields.get(field) {
            collect_scalars(value, &mut out);
        }
        out
    }

    /// Whether the field has at least one non-empty value.
    pub fn has_value(&self, field: &str) -> bool {
        !self.values(field).is_empty()
    }

    /// First value of a field, if any.
    pub fn first(&self, field: &str) -> Option<String> {
        self.values(field).into_iter().next()
    }
}

fn collect_scalars(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.trim().is_empty() => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|v| collect_scalars(v, out)),
        _ => {}
    }
}
