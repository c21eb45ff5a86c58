//! `CubeQuery` (§4.6): what a caller asks the planner for, and
//! `QueryResult`: what it gets back, including the planner's own
//! diagnostics (dropped measures, an incomplete-plan warning, and
//! drill-down suggestions).

use data_types::Record;
use predicate::AggregationPredicate;

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: false }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: true }
    }
}

#[derive(Debug, Clone)]
pub struct CubeQuery {
    pub attributes: Vec<String>,
    pub measures: Vec<String>,
    pub r#where: AggregationPredicate,
    pub having: AggregationPredicate,
    pub orderings: Vec<OrderBy>,
    pub offset: usize,
    pub limit: usize,
}

impl CubeQuery {
    pub fn new(attributes: Vec<String>, measures: Vec<String>) -> Self {
        Self {
            attributes,
            measures,
            r#where: AggregationPredicate::AlwaysTrue,
            having: AggregationPredicate::AlwaysTrue,
            orderings: Vec::new(),
            offset: 0,
            limit: usize::MAX,
        }
    }

    #[must_use]
    pub fn with_where(mut self, predicate: AggregationPredicate) -> Self {
        self.r#where = predicate;
        self
    }

    #[must_use]
    pub fn with_having(mut self, predicate: AggregationPredicate) -> Self {
        self.having = predicate;
        self
    }

    #[must_use]
    pub fn with_ordering(mut self, ordering: OrderBy) -> Self {
        self.orderings.push(ordering);
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// One leaf-refining suggestion from drill-down synthesis (§4.6): the
/// additional dimension chain, and which aggregation could answer it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillDown {
    pub aggregation_id: String,
    pub chain: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<Record>,
    /// Rows matching `where`/`having` before `offset`/`limit` were
    /// applied — what a caller paginating through the full result set
    /// needs to know when to stop.
    pub total_count: usize,
    pub totals: Record,
    /// Requested measures no aggregation could cover; present (and
    /// `null`/absent in every row) rather than failing the query (§4.6).
    pub dropped_measures: Vec<String>,
    pub drill_downs: Vec<DrillDown>,
}
