//! DataKernel-Cube: a read-optimised multidimensional OLAP engine (§1).
//!
//! A [`Cube`] is a schema of typed dimensions, typed measures (each with
//! a commutative-associative aggregator), and computed measures over
//! many disjoint aggregations — materialised projections over a subset
//! of dimensions and measures, each a log-structured merge forest of
//! immutable sorted chunks (the `aggregation`/`chunk_store`/
//! `chunk_storage` crates). Ingest routes records through a splitter
//! (`reducer`) to every aggregation whose predicate/dimension/measure
//! set accepts them; query selects the cheapest covering aggregations
//! and reduces their sorted outputs (`cube_planner`); consolidation
//! compacts overlapping chunks in the background.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::use_self)]

mod cube;
mod error;
mod ingest;

pub use cube::Cube;
pub use cube_planner::{AttributeResolver, CubeQuery, DrillDown, OrderBy, QueryResult};
pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use chunk_storage::InMemoryChunkStorage;
    use cube_time::{MockProvider, SystemProvider, Time};
    use data_types::{AggregationConfig, Record, Schema, SumI64};
    use metadata_store::InMemoryMetadataStore;
    use predicate::{FieldType, Value};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn flat_schema() -> Schema {
        Schema::new()
            .with_dimension("day", FieldType::I32)
            .with_measure("clicks", FieldType::I64, Arc::new(SumI64))
            .with_measure("views", FieldType::I64, Arc::new(SumI64))
    }

    fn cube(schema: Schema) -> Cube {
        Cube::new(
            schema,
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryChunkStorage::new()),
            Arc::new(MockProvider::new(Time::from_timestamp_millis(0))),
            None,
        )
        .unwrap()
    }

    fn rec(day: i32, clicks: i64) -> Record {
        Record::new().with_field("day", Value::i32(day)).with_field("clicks", Value::i64(clicks))
    }

    /// Scenario 3 (§8): single aggregation, ingest then query with totals.
    #[tokio::test]
    async fn single_aggregation_ingest_and_query() {
        let schema = flat_schema().with_aggregation(AggregationConfig::new(
            "by_day",
            vec!["day".into()],
            vec!["clicks".into()],
        ));
        let cube = cube(schema);

        cube.ingest(vec![rec(1, 1), rec(1, 2), rec(2, 5)]).await.unwrap();

        let result = cube
            .query(CubeQuery::new(vec!["day".into()], vec!["clicks".into()]))
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].get("day"), Some(&Value::i32(1)));
        assert_eq!(result.rows[0].get("clicks"), Some(&Value::i64(3)));
        assert_eq!(result.rows[1].get("clicks"), Some(&Value::i64(5)));
        assert_eq!(result.totals.get("clicks"), Some(&Value::i64(8)));
    }

    /// Scenario 4 (§8): two aggregations, each with one measure; the
    /// planner picks both and the reducer merges their rows by `day`.
    #[tokio::test]
    async fn multi_aggregation_fan_in_through_ingest_routing() {
        let schema = flat_schema()
            .with_aggregation(AggregationConfig::new("by_clicks", vec!["day".into()], vec!["clicks".into()]))
            .with_aggregation(AggregationConfig::new("by_views", vec!["day".into()], vec!["views".into()]));
        let cube = cube(schema);

        let records = vec![
            Record::new().with_field("day", Value::i32(1)).with_field("clicks", Value::i64(2)).with_field("views", Value::i64(20)),
            Record::new().with_field("day", Value::i32(2)).with_field("clicks", Value::i64(3)).with_field("views", Value::i64(30)),
        ];
        cube.ingest(records).await.unwrap();

        let result = cube
            .query(CubeQuery::new(vec!["day".into()], vec!["clicks".into(), "views".into()]))
            .await
            .unwrap();
        assert_eq!(
            result.rows,
            vec![
                Record::new().with_field("day", Value::i32(1)).with_field("clicks", Value::i64(2)).with_field("views", Value::i64(20)),
                Record::new().with_field("day", Value::i32(2)).with_field("clicks", Value::i64(3)).with_field("views", Value::i64(30)),
            ]
        );
    }

    /// Scenario 6 (§8): `day -> month -> year`; querying at `month`
    /// surfaces a `[day]` drill-down but not `[month]` or `[year]`.
    #[tokio::test]
    async fn drill_down_chain_through_the_facade() {
        let schema = flat_schema()
            .with_dimension("month", FieldType::I32)
            .with_dimension("year", FieldType::I32)
            .with_child_parent("day", "month")
            .with_child_parent("month", "year")
            .with_aggregation(AggregationConfig::new(
                "by_month",
                vec!["month".into(), "year".into()],
                vec!["clicks".into()],
            ))
            .with_aggregation(AggregationConfig::new(
                "by_day",
                vec!["day".into(), "month".into(), "year".into()],
                vec!["clicks".into()],
            ));
        let cube = cube(schema);

        cube.ingest(vec![
            Record::new().with_field("day", Value::i32(1)).with_field("month", Value::i32(1)).with_field("year", Value::i32(2024)).with_field("clicks", Value::i64(7)),
        ])
        .await
        .unwrap();

        let result = cube
            .query(CubeQuery::new(vec!["month".into()], vec!["clicks".into()]))
            .await
            .unwrap();
        assert!(result.drill_downs.iter().any(|d| d.aggregation_id == "by_day" && d.chain == vec!["day".to_string()]));
        assert!(!result.drill_downs.iter().any(|d| d.chain == vec!["month".to_string()]));
        assert!(!result.drill_downs.iter().any(|d| d.chain == vec!["year".to_string()]));
    }

    /// Scenario 5's cube-level counterpart: consolidation runs per
    /// aggregation and reports which ones actually merged something.
    #[tokio::test]
    async fn consolidate_is_a_noop_with_no_overlapping_chunks() {
        let schema = flat_schema().with_aggregation(AggregationConfig::new(
            "by_day",
            vec!["day".into()],
            vec!["clicks".into()],
        ));
        let cube = cube(schema);
        cube.ingest(vec![rec(1, 1)]).await.unwrap();

        let ran = cube.consolidate().await.unwrap();
        assert_eq!(ran.get("by_day"), Some(&false));
    }

    #[tokio::test]
    async fn system_provider_drives_a_real_cube_without_a_mock_clock() {
        let schema = flat_schema().with_aggregation(AggregationConfig::new(
            "by_day",
            vec!["day".into()],
            vec!["clicks".into()],
        ));
        let cube = Cube::new(
            schema,
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryChunkStorage::new()),
            Arc::new(SystemProvider::new()),
            None,
        )
        .unwrap();
        cube.ingest(vec![rec(1, 1)]).await.unwrap();
        let result = cube
            .query(CubeQuery::new(vec!["day".into()], vec!["clicks".into()]))
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 1);
    }
}
