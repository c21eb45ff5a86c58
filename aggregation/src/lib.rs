//! The aggregation engine (C5, §4.5): ingest, sorted-merge query, cost
//! estimation, and background consolidation for one materialised
//! projection over a subset of the cube's dimensions and measures.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::use_self)]

mod bounds;
mod engine;
mod error;
mod query;

pub use engine::AggregationEngine;
pub use error::{Error, Result};
pub use query::AggregationQuery;

#[cfg(test)]
mod tests {
    use super::*;
    use chunk_storage::InMemoryChunkStorage;
    use cube_time::{MockProvider, Time};
    use data_types::{AggregationConfig, Last, Record, Schema, SumI64};
    use metadata_store::InMemoryMetadataStore;
    use predicate::{AggregationPredicate, FieldType, Value};
    use std::sync::Arc;

    fn schema() -> Schema {
        Schema::new()
            .with_dimension("day", FieldType::I32)
            .with_dimension("region", FieldType::Utf8)
            .with_measure("clicks", FieldType::I64, Arc::new(SumI64))
            .with_measure("status", FieldType::Utf8, Arc::new(Last))
    }

    fn engine(schema: &Schema, config: AggregationConfig) -> AggregationEngine {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let storage = Arc::new(InMemoryChunkStorage::new());
        let time = Arc::new(MockProvider::new(Time::from_timestamp_millis(0)));
        AggregationEngine::new(schema, config, metadata, storage, time).unwrap()
    }

    fn rec(day: i32, region: &str, clicks: i64) -> Record {
        Record::new()
            .with_field("day", Value::i32(day))
            .with_field("region", Value::utf8(region))
            .with_field("clicks", Value::i64(clicks))
            .with_field("status", Value::utf8("ok"))
    }

    #[tokio::test]
    async fn consume_then_query_round_trips_a_single_aggregation() {
        let schema = schema();
        let config = AggregationConfig::new(
            "by_day_region",
            vec!["day".into(), "region".into()],
            vec!["clicks".into(), "status".into()],
        );
        let engine = engine(&schema, config);

        let published = engine
            .consume(vec![
                rec(1, "east", 3),
                rec(1, "east", 4),
                rec(1, "west", 2),
            ])
            .await
            .unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(engine.chunk_count(), 1);

        let query = AggregationQuery::new(
            vec!["day".into(), "region".into()],
            vec!["clicks".into()],
        );
        let rows = engine.query(&query).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("region"), Some(&Value::utf8("east")));
        assert_eq!(rows[0].get("clicks"), Some(&Value::i64(7)));
        assert_eq!(rows[1].get("region"), Some(&Value::utf8("west")));
        assert_eq!(rows[1].get("clicks"), Some(&Value::i64(2)));
    }

    #[tokio::test]
    async fn query_groups_onto_a_dimension_subset_of_the_primary_key() {
        let schema = schema();
        let config = AggregationConfig::new(
            "by_day_region",
            vec!["day".into(), "region".into()],
            vec!["clicks".into()],
        );
        let engine = engine(&schema, config);
        engine
            .consume(vec![rec(1, "east", 3), rec(1, "west", 2)])
            .await
            .unwrap();

        let query = AggregationQuery::new(vec!["day".into()], vec!["clicks".into()]);
        let rows = engine.query(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("clicks"), Some(&Value::i64(5)));
    }

    #[tokio::test]
    async fn ingest_predicate_filters_out_non_matching_records() {
        let schema = schema();
        let mut config = AggregationConfig::new(
            "east_only",
            vec!["day".into(), "region".into()],
            vec!["clicks".into()],
        );
        config.predicate = AggregationPredicate::Eq("region".into(), Value::utf8("east"));
        let engine = engine(&schema, config);
        engine
            .consume(vec![rec(1, "east", 3), rec(1, "west", 2)])
            .await
            .unwrap();

        let query = AggregationQuery::new(
            vec!["day".into(), "region".into()],
            vec!["clicks".into()],
        );
        let rows = engine.query(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("region"), Some(&Value::utf8("east")));
    }

    #[tokio::test]
    async fn query_rejects_a_dimension_outside_the_primary_key() {
        let schema = schema();
        let config = AggregationConfig::new("by_day", vec!["day".into()], vec!["clicks".into()]);
        let engine = engine(&schema, config);
        let query = AggregationQuery::new(vec!["region".into()], vec!["clicks".into()]);
        assert!(engine.query(&query).await.is_err());
    }

    #[tokio::test]
    async fn key_range_prunes_chunks_outside_an_equality_predicate() {
        let schema = schema();
        let config = AggregationConfig::new("by_day", vec!["day".into()], vec!["clicks".into()]);
        let engine = engine(&schema, config);
        engine
            .consume(vec![rec(1, "east", 1)])
            .await
            .unwrap();
        engine
            .consume(vec![rec(2, "east", 2)])
            .await
            .unwrap();
        assert_eq!(engine.chunk_count(), 2);

        let query = AggregationQuery::new(vec!["day".into()], vec!["clicks".into()])
            .with_predicate(AggregationPredicate::Eq("day".into(), Value::i32(1)));
        let rows = engine.query(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("clicks"), Some(&Value::i64(1)));
    }

    #[tokio::test]
    async fn estimate_cost_grows_with_overlapping_chunks() {
        let schema = schema();
        let config = AggregationConfig::new("by_day", vec!["day".into()], vec!["clicks".into()]);
        let engine = engine(&schema, config);
        let always = AggregationPredicate::AlwaysTrue;
        assert_eq!(engine.estimate_cost(&always), 0);

        engine.consume(vec![rec(1, "east", 1)]).await.unwrap();
        let one_chunk_cost = engine.estimate_cost(&always);
        assert!(one_chunk_cost > 0);

        engine.consume(vec![rec(1, "west", 1)]).await.unwrap();
        let two_overlapping_chunks_cost = engine.estimate_cost(&always);
        assert!(two_overlapping_chunks_cost > one_chunk_cost);
    }

    #[tokio::test]
    async fn consolidation_preserves_query_results() {
        let schema = schema();
        let config = AggregationConfig::new("by_day", vec!["day".into()], vec!["clicks".into()]);
        let engine = engine(&schema, config);

        // Five separate ingests at the same key produce five fully
        // overlapping (identical-range) chunks, over the consolidation
        // threshold.
        for _ in 0..5 {
            engine.consume(vec![rec(1, "east", 1)]).await.unwrap();
        }
        assert_eq!(engine.chunk_count(), 5);

        let consolidated = engine.consolidate().await.unwrap();
        assert!(consolidated);
        assert!(engine.chunk_count() < 5);

        let query = AggregationQuery::new(vec!["day".into()], vec!["clicks".into()]);
        let rows = engine.query(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("clicks"), Some(&Value::i64(5)));
    }

    #[tokio::test]
    async fn consolidation_is_a_noop_below_the_overlap_threshold() {
        let schema = schema();
        let config = AggregationConfig::new("by_day", vec!["day".into()], vec!["clicks".into()]);
        let engine = engine(&schema, config);
        engine.consume(vec![rec(1, "east", 1)]).await.unwrap();
        assert!(!engine.consolidate().await.unwrap());
    }
}
