//! The `Cube` facade (§1, §6): a cube-wide `Schema`, one live
//! `AggregationEngine` per catalogued `AggregationConfig`, ingest routing
//! through the C7 splitter, and a single `query` entry point delegating
//! to `CubePlanner`.

use crate::error::{self, Result};
use crate::ingest;
use aggregation::AggregationEngine;
use chunk_storage::ChunkStorage;
use cube_planner::{AttributeResolver, CubePlanner, CubeQuery, QueryResult};
use cube_time::TimeProvider;
use data_types::{ChunkMeta, Record, Schema};
use metadata_store::MetadataStore;
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ties a cube-wide schema to the collaborators every aggregation it
/// catalogues needs: a shared `MetadataStore`, a shared `ChunkStorage`,
/// and a shared clock.
#[derive(Debug)]
pub struct Cube {
    schema: Arc<Schema>,
    aggregations: BTreeMap<String, Arc<AggregationEngine>>,
    planner: CubePlanner,
}

impl Cube {
    /// Build one `AggregationEngine` for every `AggregationConfig` in
    /// `schema.aggregations` (§3), sharing the given collaborators.
    pub fn new(
        schema: Schema,
        metadata: Arc<dyn MetadataStore>,
        storage: Arc<dyn ChunkStorage>,
        time: Arc<dyn TimeProvider>,
        resolver: Option<Arc<dyn AttributeResolver>>,
    ) -> Result<Self> {
        let schema = Arc::new(schema);
        let mut aggregations = BTreeMap::new();
        for config in schema.aggregations.values() {
            let engine = AggregationEngine::new(
                schema.as_ref(),
                config.clone(),
                metadata.clone(),
                storage.clone(),
                time.clone(),
            )
            .context(error::AggregationSnafu)?;
            aggregations.insert(config.id.clone(), Arc::new(engine));
        }
        let planner = CubePlanner::new(schema.clone(), aggregations.clone(), resolver);
        Ok(Self { schema, aggregations, planner })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn aggregation(&self, id: &str) -> Option<&Arc<AggregationEngine>> {
        self.aggregations.get(id)
    }

    /// Route `records` to every matching aggregation and seal/publish new
    /// chunks (§1 data flow: "ingest").
    pub async fn ingest(&self, records: Vec<Record>) -> Result<Vec<ChunkMeta>> {
        ingest::ingest(&self.aggregations, records).await
    }

    /// Plan, merge, and post-process a query against the whole cube
    /// (§1 data flow: "query").
    pub async fn query(&self, query: CubeQuery) -> Result<QueryResult> {
        self.planner.query(query).await.context(error::PlanSnafu)
    }

    /// Run one consolidation pass per aggregation, returning which ones
    /// actually merged something (§1 data flow: "background").
    pub async fn consolidate(&self) -> Result<BTreeMap<String, bool>> {
        let mut ran = BTreeMap::new();
        for (id, engine) in &self.aggregations {
            let did = engine.consolidate().await.context(error::AggregationSnafu)?;
            ran.insert(id.clone(), did);
        }
        Ok(ran)
    }
}
