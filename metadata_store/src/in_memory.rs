//! In-memory reference `MetadataStore`, with `load_chunks` request
//! coalescing modelled on `CacheDriver`'s running-queries map: a single
//! in-flight load per aggregation, later callers clone the same `Shared`
//! future instead of each re-reading the backing map.

use crate::error::{self, Error, Result};
use crate::MetadataStore;
use async_trait::async_trait;
use data_types::ChunkMeta;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct AggregationRecord {
    revision: u64,
    chunks: BTreeMap<u64, ChunkMeta>,
    claimed: BTreeSet<u64>,
}

type LoadFuture = Shared<BoxFuture<'static, Vec<ChunkMeta>>>;

#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    next_chunk_id: AtomicU64,
    state: Arc<Mutex<HashMap<String, AggregationRecord>>>,
    running_loads: Mutex<HashMap<String, LoadFuture>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn create_chunk_id(&self) -> u64 {
        self.next_chunk_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn load_chunks(&self, aggregation_id: &str, since_revision: u64) -> Vec<ChunkMeta> {
        let fut = {
            let mut running = self.running_loads.lock();
            if let Some(existing) = running.get(aggregation_id) {
                existing.clone()
            } else {
                let state = Arc::clone(&self.state);
                let agg_id = aggregation_id.to_string();
                let fut: BoxFuture<'static, Vec<ChunkMeta>> = Box::pin(async move {
                    let state = state.lock();
                    state
                        .get(&agg_id)
                        .map(|r| r.chunks.values().cloned().collect())
                        .unwrap_or_default()
                });
                let shared = fut.shared();
                running.insert(aggregation_id.to_string(), shared.clone());
                shared
            }
        };

        let result = fut.await;
        self.running_loads.lock().remove(aggregation_id);
        result
            .into_iter()
            .filter(|c| c.revision >= since_revision)
            .collect()
    }

    async fn publish_chunks(&self, aggregation_id: &str, chunks: Vec<ChunkMeta>) -> Result<()> {
        let mut state = self.state.lock();
        let record = state.entry(aggregation_id.to_string()).or_default();
        record.revision += 1;
        for mut chunk in chunks {
            chunk.revision = record.revision;
            record.chunks.insert(chunk.id, chunk);
        }
        Ok(())
    }

    async fn start_consolidation(&self, aggregation_id: &str, chunks: &[u64]) -> Result<()> {
        let mut state = self.state.lock();
        let record = state.entry(aggregation_id.to_string()).or_default();
        if chunks.iter().any(|id| record.claimed.contains(id)) {
            return error::ClaimConflictSnafu.fail();
        }
        record.claimed.extend(chunks.iter().copied());
        Ok(())
    }

    async fn save_consolidated_chunks(
        &self,
        aggregation_id: &str,
        original: &[u64],
        replacement: Vec<ChunkMeta>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let record = state.entry(aggregation_id.to_string()).or_default();
        for id in original {
            record.chunks.remove(id);
            record.claimed.remove(id);
        }
        record.revision += 1;
        for mut chunk in replacement {
            chunk.revision = record.revision;
            record.chunks.insert(chunk.id, chunk);
        }
        Ok(())
    }

    async fn release_claim(&self, aggregation_id: &str, chunks: &[u64]) {
        let mut state = self.state.lock();
        if let Some(record) = state.get_mut(aggregation_id) {
            for id in chunks {
                record.claimed.remove(id);
            }
        }
    }
}
