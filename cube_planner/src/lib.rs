//! The cube query planner (C6, §4.6): turns a [`CubeQuery`] into the set
//! of aggregation sub-queries that can answer it, merges their results,
//! and applies everything downstream of storage — computed measures,
//! `having`, attribute resolution, ordering, pagination, totals, and
//! drill-down suggestions.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::use_self)]

mod drilldown;
mod error;
mod expand;
mod order;
mod planner;
mod query;
mod resolver;
mod select;

pub use error::{Error, Result};
pub use planner::CubePlanner;
pub use query::{CubeQuery, DrillDown, OrderBy, QueryResult};
pub use resolver::AttributeResolver;

#[cfg(test)]
mod tests {
    use super::*;
    use aggregation::{AggregationEngine, AggregationQuery};
    use async_trait::async_trait;
    use chunk_storage::InMemoryChunkStorage;
    use cube_time::{MockProvider, Time};
    use data_types::{AggregationConfig, ComputedMeasure, Record, Schema, SumI64};
    use metadata_store::InMemoryMetadataStore;
    use predicate::{AggregationPredicate, FieldType, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    /// No `day -> month -> year` drill-down chain — used by tests where
    /// each aggregation only covers the bare `day` key, so pulling in
    /// ancestors would leave no aggregation able to answer the query.
    fn flat_schema() -> Schema {
        Schema::new()
            .with_dimension("day", FieldType::I32)
            .with_dimension("month", FieldType::I32)
            .with_dimension("year", FieldType::I32)
            .with_measure("clicks", FieldType::I64, Arc::new(SumI64))
            .with_measure("impressions", FieldType::I64, Arc::new(SumI64))
            .with_computed_measure(
                "ctr",
                ComputedMeasure::new(vec!["clicks".into(), "impressions".into()], |deps| {
                    match (deps.get("clicks"), deps.get("impressions")) {
                        (Some(Value::I64(c)), Some(Value::I64(i))) if *i != 0 => {
                            Some(Value::f64(*c as f64 / *i as f64))
                        }
                        _ => None,
                    }
                }),
            )
    }

    fn hierarchical_schema() -> Schema {
        flat_schema().with_child_parent("day", "month").with_child_parent("month", "year")
    }

    fn engine(schema: &Schema, config: AggregationConfig) -> Arc<AggregationEngine> {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let storage = Arc::new(InMemoryChunkStorage::new());
        let time = Arc::new(MockProvider::new(Time::from_timestamp_millis(0)));
        Arc::new(AggregationEngine::new(schema, config, metadata, storage, time).unwrap())
    }

    fn rec(day: i32, month: i32, year: i32, clicks: i64, impressions: i64) -> Record {
        Record::new()
            .with_field("day", Value::i32(day))
            .with_field("month", Value::i32(month))
            .with_field("year", Value::i32(year))
            .with_field("clicks", Value::i64(clicks))
            .with_field("impressions", Value::i64(impressions))
    }

    #[tokio::test]
    async fn single_aggregation_query_round_trips() {
        let schema = flat_schema();
        let by_day = engine(
            &schema,
            AggregationConfig::new(
                "by_day",
                vec!["day".into(), "month".into(), "year".into()],
                vec!["clicks".into(), "impressions".into()],
            ),
        );
        by_day
            .consume(vec![rec(1, 1, 2024, 3, 10), rec(1, 1, 2024, 4, 10)])
            .await
            .unwrap();

        let mut aggregations = BTreeMap::new();
        aggregations.insert("by_day".to_string(), by_day);
        let planner = CubePlanner::new(Arc::new(schema), aggregations, None);

        let result = planner
            .query(CubeQuery::new(vec!["day".into()], vec!["clicks".into(), "ctr".into()]))
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].get("clicks"), Some(&Value::i64(7)));
        assert_eq!(result.rows[0].get("ctr"), Some(&Value::f64(0.35)));
        assert!(result.dropped_measures.is_empty());
    }

    #[tokio::test]
    async fn requesting_a_dimension_pulls_in_its_ancestors() {
        let schema = hierarchical_schema();
        let by_day = engine(
            &schema,
            AggregationConfig::new(
                "by_day",
                vec!["day".into(), "month".into(), "year".into()],
                vec!["clicks".into()],
            ),
        );
        by_day.consume(vec![rec(15, 6, 2024, 5, 0)]).await.unwrap();

        let mut aggregations = BTreeMap::new();
        aggregations.insert("by_day".to_string(), by_day);
        let planner = CubePlanner::new(Arc::new(schema), aggregations, None);

        let result = planner
            .query(CubeQuery::new(vec!["day".into()], vec!["clicks".into()]))
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].get("month"), Some(&Value::i32(6)));
        assert_eq!(result.rows[0].get("year"), Some(&Value::i32(2024)));
    }

    #[tokio::test]
    async fn multi_aggregation_fan_in_merges_measures_by_key() {
        let schema = flat_schema();
        let by_clicks = engine(
            &schema,
            AggregationConfig::new("by_clicks", vec!["day".into()], vec!["clicks".into()]),
        );
        let by_impressions = engine(
            &schema,
            AggregationConfig::new("by_impressions", vec!["day".into()], vec!["impressions".into()]),
        );
        by_clicks.consume(vec![rec(1, 1, 2024, 5, 0), rec(2, 1, 2024, 6, 0)]).await.unwrap();
        by_impressions.consume(vec![rec(1, 1, 2024, 0, 50), rec(2, 1, 2024, 0, 60)]).await.unwrap();

        let mut aggregations = BTreeMap::new();
        aggregations.insert("by_clicks".to_string(), by_clicks);
        aggregations.insert("by_impressions".to_string(), by_impressions);
        let planner = CubePlanner::new(Arc::new(schema), aggregations, None);

        let result = planner
            .query(CubeQuery::new(vec!["day".into()], vec!["clicks".into(), "impressions".into()]))
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].get("clicks"), Some(&Value::i64(5)));
        assert_eq!(result.rows[0].get("impressions"), Some(&Value::i64(50)));
        assert_eq!(result.rows[1].get("clicks"), Some(&Value::i64(6)));
        assert_eq!(result.rows[1].get("impressions"), Some(&Value::i64(60)));
        assert_eq!(result.totals.get("clicks"), Some(&Value::i64(11)));
    }

    #[tokio::test]
    async fn unreachable_measures_are_dropped_not_fatal() {
        let schema = flat_schema();
        let by_day = engine(
            &schema,
            AggregationConfig::new("by_day", vec!["day".into()], vec!["clicks".into()]),
        );
        by_day.consume(vec![rec(1, 1, 2024, 5, 0)]).await.unwrap();

        let mut aggregations = BTreeMap::new();
        aggregations.insert("by_day".to_string(), by_day);
        let planner = CubePlanner::new(Arc::new(schema), aggregations, None);

        let result = planner
            .query(CubeQuery::new(vec!["day".into()], vec!["clicks".into(), "impressions".into()]))
            .await
            .unwrap();
        assert_eq!(result.dropped_measures, vec!["impressions".to_string()]);
        assert_eq!(result.rows[0].get("clicks"), Some(&Value::i64(5)));
    }

    /// A typo'd measure name is a hard `UnknownMeasure` error, not folded
    /// into `dropped_measures` alongside a real-but-uncovered measure.
    #[tokio::test]
    async fn nonexistent_measure_is_unknown_measure_not_a_silent_drop() {
        let schema = flat_schema();
        let by_day = engine(
            &schema,
            AggregationConfig::new("by_day", vec!["day".into()], vec!["clicks".into()]),
        );
        by_day.consume(vec![rec(1, 1, 2024, 5, 0)]).await.unwrap();

        let mut aggregations = BTreeMap::new();
        aggregations.insert("by_day".to_string(), by_day);
        let planner = CubePlanner::new(Arc::new(schema), aggregations, None);

        let result = planner
            .query(CubeQuery::new(vec!["day".into()], vec!["nonexistent".into()]))
            .await;
        assert!(matches!(result, Err(Error::UnknownMeasure { measure }) if measure == "nonexistent"));
    }

    #[tokio::test]
    async fn where_predicate_on_an_unknown_dimension_errors() {
        let schema = flat_schema();
        let by_day = engine(
            &schema,
            AggregationConfig::new("by_day", vec!["day".into()], vec!["clicks".into()]),
        );
        by_day.consume(vec![rec(1, 1, 2024, 5, 0)]).await.unwrap();

        let mut aggregations = BTreeMap::new();
        aggregations.insert("by_day".to_string(), by_day);
        let planner = CubePlanner::new(Arc::new(schema), aggregations, None);

        let result = planner
            .query(
                CubeQuery::new(vec!["day".into()], vec!["clicks".into()])
                    .with_where(AggregationPredicate::Eq("region".to_string(), Value::i32(1))),
            )
            .await;
        assert!(matches!(result, Err(Error::UnknownDimension { dimension }) if dimension == "region"));
    }

    /// Every requested measure exists in the schema but none is stored by
    /// any current aggregation for these dimensions — `IncompatibleMeasures`,
    /// distinct from the partial-drop case where at least one measure
    /// survives.
    #[tokio::test]
    async fn no_compatible_measure_at_all_is_incompatible_measures() {
        let schema = flat_schema();
        let by_day = engine(
            &schema,
            AggregationConfig::new("by_day", vec!["day".into()], Vec::new()),
        );

        let mut aggregations = BTreeMap::new();
        aggregations.insert("by_day".to_string(), by_day);
        let planner = CubePlanner::new(Arc::new(schema), aggregations, None);

        let result = planner
            .query(CubeQuery::new(vec!["day".into()], vec!["clicks".into()]))
            .await;
        assert!(matches!(result, Err(Error::IncompatibleMeasures { .. })));
    }

    /// No aggregation's keys cover the requested dimensions at all —
    /// there is no data source to plan against, not merely a missing
    /// measure.
    #[tokio::test]
    async fn no_aggregation_covering_the_dimensions_errors() {
        let schema = flat_schema();
        let planner = CubePlanner::new(Arc::new(schema), BTreeMap::new(), None);

        let result = planner.query(CubeQuery::new(vec!["day".into()], Vec::new())).await;
        assert!(matches!(result, Err(Error::NoCoveringAggregation { dims }) if dims == vec!["day".to_string()]));
    }

    #[tokio::test]
    async fn ordering_and_pagination_apply_after_merge() {
        let schema = flat_schema();
        let by_day = engine(
            &schema,
            AggregationConfig::new("by_day", vec!["day".into()], vec!["clicks".into()]),
        );
        by_day
            .consume(vec![rec(1, 1, 2024, 3, 0), rec(2, 1, 2024, 9, 0), rec(3, 1, 2024, 1, 0)])
            .await
            .unwrap();

        let mut aggregations = BTreeMap::new();
        aggregations.insert("by_day".to_string(), by_day);
        let planner = CubePlanner::new(Arc::new(schema), aggregations, None);

        let result = planner
            .query(
                CubeQuery::new(vec!["day".into()], vec!["clicks".into()])
                    .with_ordering(OrderBy::desc("clicks"))
                    .with_limit(2),
            )
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].get("clicks"), Some(&Value::i64(9)));
        assert_eq!(result.rows[1].get("clicks"), Some(&Value::i64(3)));
    }

    #[derive(Debug)]
    struct GeoResolver {
        keys: Vec<String>,
        types: BTreeMap<String, FieldType>,
    }

    impl GeoResolver {
        fn new() -> Self {
            Self {
                keys: vec!["day".to_string()],
                types: BTreeMap::from([("region".to_string(), FieldType::Utf8)]),
            }
        }
    }

    #[async_trait]
    impl AttributeResolver for GeoResolver {
        fn key_dimensions(&self) -> &[String] {
            &self.keys
        }

        fn attribute_types(&self) -> &BTreeMap<String, FieldType> {
            &self.types
        }

        async fn resolve(&self, keys: Vec<Vec<Value>>) -> Vec<BTreeMap<String, Value>> {
            keys.into_iter()
                .map(|k| BTreeMap::from([("region".to_string(), Value::utf8(format!("region-{}", match &k[0] {
                    Value::I32(d) => *d,
                    _ => unreachable!(),
                })))]))
                .collect()
        }
    }

    #[tokio::test]
    async fn unknown_attribute_without_a_matching_resolver_errors() {
        let schema = flat_schema();
        let planner = CubePlanner::new(Arc::new(schema), BTreeMap::new(), None);
        let result = planner.query(CubeQuery::new(vec!["region".into()], vec![])).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn resolver_satisfies_a_non_dimension_attribute() {
        let schema = flat_schema();
        let by_day = engine(
            &schema,
            AggregationConfig::new("by_day", vec!["day".into()], vec!["clicks".into()]),
        );
        by_day.consume(vec![rec(1, 1, 2024, 5, 0)]).await.unwrap();

        let mut aggregations = BTreeMap::new();
        aggregations.insert("by_day".to_string(), by_day);
        let planner = CubePlanner::new(Arc::new(schema), aggregations, Some(Arc::new(GeoResolver::new())));

        let result = planner
            .query(CubeQuery::new(vec!["region".into()], vec!["clicks".into()]))
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].get("region"), Some(&Value::utf8("region-1")));
    }

    #[tokio::test]
    async fn drill_down_is_suggested_when_a_finer_aggregation_exists() {
        let schema = hierarchical_schema();
        let by_month = engine(
            &schema,
            AggregationConfig::new("by_month", vec!["month".into(), "year".into()], vec!["clicks".into()]),
        );
        let by_day = engine(
            &schema,
            AggregationConfig::new("by_day", vec!["day".into(), "month".into(), "year".into()], vec!["clicks".into()]),
        );
        by_month.consume(vec![rec(1, 1, 2024, 7, 0)]).await.unwrap();

        let mut aggregations = BTreeMap::new();
        aggregations.insert("by_month".to_string(), by_month);
        aggregations.insert("by_day".to_string(), by_day);
        let planner = CubePlanner::new(Arc::new(schema), aggregations, None);

        let result = planner
            .query(CubeQuery::new(vec!["month".into()], vec!["clicks".into()]))
            .await
            .unwrap();
        assert!(result.drill_downs.iter().any(|d| d.aggregation_id == "by_day" && d.chain == vec!["day".to_string()]));
    }
}
