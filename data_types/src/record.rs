//! The ingest unit (§3): a tuple of typed values keyed by field name.

use predicate::{Fields, Value};
use std::collections::BTreeMap;

/// A record carries at least every dimension referenced by some aggregation
/// plus every measure supplied at ingest time. Field order is irrelevant;
/// lookups are always by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Project this record onto an ordered list of field names, failing if
    /// any is missing. Used to derive the primary-key tuple for a given
    /// aggregation's `keys`.
    pub fn project(&self, names: &[String]) -> Option<Vec<Value>> {
        names.iter().map(|n| self.fields.get(n).cloned()).collect()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fold `other`'s fields into this record, overwriting on name clash.
    /// Used by the cube planner to combine the per-aggregation rows that
    /// answer the same dimension key into one output row.
    #[must_use]
    pub fn merge(mut self, other: &Record) -> Self {
        for (name, value) in other.fields() {
            self.fields.insert(name.to_string(), value.clone());
        }
        self
    }
}

impl Fields for Record {
    fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
