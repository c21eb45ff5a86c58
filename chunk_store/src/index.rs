//! Per-aggregation chunk index (§4.3): the live chunk set plus the queries
//! the aggregation engine and the consolidation planner run against it.

use data_types::ChunkMeta;
use predicate::Value;
use std::collections::BTreeMap;

/// Which chunks a consolidation pass should pick (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsolidationStrategy {
    /// The longest run of mutually overlapping chunks around the most
    /// contended key.
    HotSegment,
    /// The `k` chunks with the smallest `min_key`.
    MinKey,
}

/// The live chunk set for one aggregation, keyed by id.
#[derive(Debug, Default)]
pub struct ChunkIndex {
    by_id: BTreeMap<u64, ChunkMeta>,
}

impl ChunkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, meta: ChunkMeta) {
        self.by_id.insert(meta.id, meta);
    }

    pub fn remove(&mut self, id: u64) -> Option<ChunkMeta> {
        self.by_id.remove(&id)
    }

    pub fn get(&self, id: u64) -> Option<&ChunkMeta> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn sorted_by_min_key(&self) -> Vec<ChunkMeta> {
        let mut metas: Vec<ChunkMeta> = self.by_id.values().cloned().collect();
        metas.sort_by(|a, b| a.min_key.cmp(&b.min_key).then(a.id.cmp(&b.id)));
        metas
    }

    /// Chunks whose `[min_key, max_key]` intersects `[lo, hi]`, ordered by
    /// `(min_key, id)` (§4.3).
    pub fn chunks_intersecting(&self, lo: &[Value], hi: &[Value]) -> Vec<ChunkMeta> {
        self.sorted_by_min_key()
            .into_iter()
            .filter(|m| m.min_key.as_slice() <= hi && lo <= m.max_key.as_slice())
            .collect()
    }

    /// How many other chunks' ranges contain `point`.
    fn contention_at(&self, point: &[Value]) -> usize {
        self.by_id
            .values()
            .filter(|m| m.min_key.as_slice() <= point && point <= m.max_key.as_slice())
            .count()
    }

    /// Number of chunks for which some *other* chunk intersects its range
    /// (§4.3) — drives the "too many overlaps" consolidation threshold.
    pub fn overlap_count(&self) -> usize {
        let metas: Vec<&ChunkMeta> = self.by_id.values().collect();
        metas
            .iter()
            .filter(|m| {
                metas
                    .iter()
                    .any(|other| other.id != m.id && m.intersects(other))
            })
            .count()
    }

    /// Pick up to `max_chunks` chunks for one consolidation pass (§4.3),
    /// ties broken by `(min_key, id)` ascending.
    pub fn pick_consolidation_set(
        &self,
        max_chunks: usize,
        strategy: ConsolidationStrategy,
    ) -> Vec<ChunkMeta> {
        if self.by_id.is_empty() {
            return Vec::new();
        }
        match strategy {
            ConsolidationStrategy::MinKey => {
                self.sorted_by_min_key().into_iter().take(max_chunks).collect()
            }
            ConsolidationStrategy::HotSegment => {
                let sorted = self.sorted_by_min_key();
                let hottest = sorted
                    .iter()
                    .max_by_key(|m| self.contention_at(&m.min_key))
                    .expect("non-empty index");
                let hot_key = hottest.min_key.clone();
                sorted
                    .into_iter()
                    .filter(|m| m.min_key.as_slice() <= hot_key.as_slice() && hot_key.as_slice() <= m.max_key.as_slice())
                    .take(max_chunks)
                    .collect()
            }
        }
    }
}
