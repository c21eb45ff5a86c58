//! `AggregationConfig` (§3): the per-aggregation knobs governing primary
//! key, chunk sizing, and the external sorter.

use predicate::AggregationPredicate;

/// Configuration for one materialised projection. `keys` is the ordered
/// primary key; `partitioning_key` must be a prefix of `keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationConfig {
    pub id: String,
    pub keys: Vec<String>,
    pub measures: Vec<String>,
    pub predicate: AggregationPredicate,
    pub partitioning_key: Vec<String>,
    pub chunk_size: usize,
    pub sorter_items_in_memory: usize,
    pub sorter_block_size: usize,
    pub max_chunks_to_consolidate: usize,
}

impl AggregationConfig {
    pub fn new(id: impl Into<String>, keys: Vec<String>, measures: Vec<String>) -> Self {
        Self {
            id: id.into(),
            partitioning_key: keys.clone(),
            keys,
            measures,
            predicate: AggregationPredicate::AlwaysTrue,
            ..Self::defaults()
        }
    }

    fn defaults() -> Self {
        Self {
            id: String::new(),
            keys: Vec::new(),
            measures: Vec::new(),
            predicate: AggregationPredicate::AlwaysTrue,
            partitioning_key: Vec::new(),
            chunk_size: 64 * 1024,
            sorter_items_in_memory: 100_000,
            sorter_block_size: 1 << 20,
            max_chunks_to_consolidate: 16,
        }
    }

    /// `partitioning_key` must be a prefix of `keys` (§3).
    pub fn is_well_formed(&self) -> bool {
        self.keys.starts_with(&self.partitioning_key)
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self::defaults()
    }
}
