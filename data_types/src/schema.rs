//! The cube-wide `Schema` (§3): dimensions, measures, computed measures,
//! drill-down chains (`childParent`), and the aggregation catalogue.

use crate::aggregator::Aggregator;
use crate::config::AggregationConfig;
use predicate::{FieldType, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A stored measure: its wire/in-memory type plus the aggregator that
/// reduces it.
#[derive(Clone)]
pub struct Measure {
    pub field_type: FieldType,
    pub aggregator: Arc<dyn Aggregator>,
}

impl fmt::Debug for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Measure")
            .field("field_type", &self.field_type)
            .field("aggregator", &self.aggregator)
            .finish()
    }
}

/// A computed measure: pure arithmetic over already-resolved measure
/// values. Modelled as a closure table rather than generated code (§9).
#[derive(Clone)]
pub struct ComputedMeasure {
    pub deps: Vec<String>,
    pub expr: Arc<dyn Fn(&BTreeMap<String, Value>) -> Option<Value> + Send + Sync>,
}

impl fmt::Debug for ComputedMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedMeasure")
            .field("deps", &self.deps)
            .finish()
    }
}

impl ComputedMeasure {
    pub fn new(
        deps: Vec<String>,
        expr: impl Fn(&BTreeMap<String, Value>) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            deps,
            expr: Arc::new(expr),
        }
    }

    pub fn evaluate(&self, resolved: &BTreeMap<String, Value>) -> Option<Value> {
        (self.expr)(resolved)
    }
}

/// The cube-wide, immutable-after-first-ingest schema (§3).
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub dimensions: BTreeMap<String, FieldType>,
    pub measures: BTreeMap<String, Measure>,
    pub computed_measures: BTreeMap<String, ComputedMeasure>,
    pub child_parent: BTreeMap<String, String>,
    pub aggregations: BTreeMap<String, AggregationConfig>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dimension(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.dimensions.insert(name.into(), field_type);
        self
    }

    #[must_use]
    pub fn with_measure(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        aggregator: Arc<dyn Aggregator>,
    ) -> Self {
        self.measures.insert(
            name.into(),
            Measure {
                field_type,
                aggregator,
            },
        );
        self
    }

    #[must_use]
    pub fn with_computed_measure(
        mut self,
        name: impl Into<String>,
        measure: ComputedMeasure,
    ) -> Self {
        self.computed_measures.insert(name.into(), measure);
        self
    }

    #[must_use]
    pub fn with_child_parent(mut self, child: impl Into<String>, parent: impl Into<String>) -> Self {
        self.child_parent.insert(child.into(), parent.into());
        self
    }

    #[must_use]
    pub fn with_aggregation(mut self, config: AggregationConfig) -> Self {
        self.aggregations.insert(config.id.clone(), config);
        self
    }

    pub fn is_dimension(&self, name: &str) -> bool {
        self.dimensions.contains_key(name)
    }

    pub fn is_measure(&self, name: &str) -> bool {
        self.measures.contains_key(name) || self.computed_measures.contains_key(name)
    }

    /// Walk `childParent` from `dim` up to a root (or a dimension already
    /// in `stop_at`), returning the chain in child-to-parent order,
    /// `dim` included. Used both by attribute expansion (C6) and
    /// drill-down synthesis (C6).
    pub fn drill_down_chain(&self, dim: &str, stop_at: &[String]) -> Vec<String> {
        let mut chain = vec![dim.to_string()];
        let mut current = dim.to_string();
        while let Some(parent) = self.child_parent.get(&current) {
            if stop_at.iter().any(|s| s == parent) {
                break;
            }
            chain.push(parent.clone());
            current = parent.clone();
        }
        chain
    }
}
