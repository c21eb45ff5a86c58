//! A query against a single aggregation (§4.5): the dimension/measure
//! subset it asks for, plus an additional residual predicate evaluated
//! after the chunk-index lookup.

use predicate::AggregationPredicate;

#[derive(Debug, Clone)]
pub struct AggregationQuery {
    /// Must be a subset of the aggregation's `keys`.
    pub dimensions: Vec<String>,
    /// Must be a subset of the aggregation's `measures`.
    pub measures: Vec<String>,
    pub predicate: AggregationPredicate,
}

impl AggregationQuery {
    pub fn new(dimensions: Vec<String>, measures: Vec<String>) -> Self {
        Self {
            dimensions,
            measures,
            predicate: AggregationPredicate::AlwaysTrue,
        }
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: AggregationPredicate) -> Self {
        self.predicate = predicate;
        self
    }
}
