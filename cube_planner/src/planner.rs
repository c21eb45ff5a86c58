//! The cube query planner (C6, §4.6): expand requested attributes into a
//! dimension set, pick a cost-ranked cover of aggregations for the
//! requested measures, merge their sub-query results, apply computed
//! measures and `having`, resolve non-dimension attributes, order and
//! paginate, compute totals, and suggest drill-downs.

use crate::drilldown::synthesize_drill_downs;
use crate::error::{self, Result};
use crate::expand::expand_attributes;
use crate::order::{effective_orderings, paginate, sort_rows};
use crate::query::{CubeQuery, QueryResult};
use crate::resolver::AttributeResolver;
use crate::select::{compatible_measures, required_stored_measures, select_aggregations};
use aggregation::{AggregationEngine, AggregationQuery};
use cube_time::Time;
use data_types::{Record, Schema};
use predicate::Value;
use reducer::{MergeReducer, Node, Produced, VecSource};
use snafu::ResultExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Ties together a cube-wide schema, the live aggregation engines that
/// back it, and the optional out-of-band attribute resolver, exposing the
/// single `query` entry point callers use (§6).
#[derive(Debug)]
pub struct CubePlanner {
    schema: Arc<Schema>,
    aggregations: BTreeMap<String, Arc<AggregationEngine>>,
    resolver: Option<Arc<dyn AttributeResolver>>,
}

impl CubePlanner {
    pub fn new(
        schema: Arc<Schema>,
        aggregations: BTreeMap<String, Arc<AggregationEngine>>,
        resolver: Option<Arc<dyn AttributeResolver>>,
    ) -> Self {
        Self { schema, aggregations, resolver }
    }

    pub async fn query(&self, query: CubeQuery) -> Result<QueryResult> {
        let requested_dims = expand_attributes(&self.schema, self.resolver.as_deref(), &query.attributes)?;
        let full_dims: BTreeSet<String> =
            requested_dims.union(&query.r#where.dimensions_of()).cloned().collect();
        let dim_order: Vec<String> = full_dims.iter().cloned().collect();

        // Mirrors `is_dimension`'s use in `expand_attributes`: validate
        // every measure/dimension name the query mentions directly
        // against the schema before asking which aggregation can supply
        // it, so a typo'd name fails as `UnknownMeasure`/`UnknownDimension`
        // (§7) instead of being folded into `dropped_measures` alongside
        // a real measure that simply isn't covered yet.
        for measure in &query.measures {
            if !self.schema.is_measure(measure) {
                return error::UnknownMeasureSnafu { measure: measure.clone() }.fail();
            }
        }
        for dim in query.r#where.dimensions_of() {
            if !self.schema.is_dimension(&dim) {
                return error::UnknownDimensionSnafu { dimension: dim }.fail();
            }
        }

        let (compatible, mut dropped) =
            compatible_measures(&self.schema, &self.aggregations, &full_dims, &query.measures);
        if compatible.is_empty() && !query.measures.is_empty() {
            return error::IncompatibleMeasuresSnafu {
                dims: full_dims.iter().cloned().collect::<Vec<_>>(),
                measures: query.measures.clone(),
            }
            .fail();
        }
        let stored_requested = required_stored_measures(&self.schema, &compatible);

        let (assignments, unmet) =
            select_aggregations(&self.aggregations, &full_dims, &query.r#where, &stored_requested)?;
        if !unmet.is_empty() {
            telemetry::warn!(unmet = ?unmet, "no aggregation covers some requested measures");
        }
        for measure in &query.measures {
            let deps = match self.schema.computed_measures.get(measure) {
                Some(computed) => computed.deps.clone(),
                None => vec![measure.clone()],
            };
            if deps.iter().any(|d| unmet.contains(d)) && !dropped.contains(measure) {
                dropped.push(measure.clone());
            }
        }
        dropped.sort();
        dropped.dedup();

        let mut per_aggregation_rows = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            let engine = &self.aggregations[&assignment.aggregation_id];
            let sub = AggregationQuery::new(dim_order.clone(), assignment.measures.clone())
                .with_predicate(query.r#where.clone());
            let mut rows = engine.query(&sub).await.context(error::AggregationSnafu)?;
            sort_rows_by_projection(&mut rows, &dim_order);
            per_aggregation_rows.push(rows);
        }

        let mut rows = merge_rows(per_aggregation_rows, &dim_order)?;

        for row in &mut rows {
            apply_computed_measures(&self.schema, &query.measures, row);
        }

        let totals = compute_totals(&self.schema, &query.measures, &rows);

        rows.retain(|r| query.having.matches(r));

        let rows = match &self.resolver {
            Some(resolver) => resolve_attributes(resolver.as_ref(), rows, &query.attributes).await,
            None => rows,
        };

        let mut rows = rows;
        let orderings = effective_orderings(&query.r#where, &query.orderings);
        sort_rows(&mut rows, &orderings);
        let total_count = rows.len();
        let rows = paginate(rows, query.offset, query.limit);

        let drill_downs = synthesize_drill_downs(&self.aggregations, &full_dims);

        Ok(QueryResult { rows, total_count, totals, dropped_measures: dropped, drill_downs })
    }
}

fn sort_rows_by_projection(rows: &mut [Record], dims: &[String]) {
    rows.sort_by(|a, b| project_key(a, dims).cmp(&project_key(b, dims)));
}

fn project_key(row: &Record, dims: &[String]) -> Vec<Value> {
    dims.iter().map(|d| row.get(d).cloned().unwrap_or(Value::Bool(false))).collect()
}

/// Single-aggregation queries skip the reducer pipeline entirely; two or
/// more are merged with the same k-way `MergeReducer` the reducer pipeline
/// uses elsewhere, combining same-key rows field-by-field.
fn merge_rows(mut per_aggregation_rows: Vec<Vec<Record>>, dims: &[String]) -> Result<Vec<Record>> {
    match per_aggregation_rows.len() {
        0 => Ok(Vec::new()),
        1 => Ok(per_aggregation_rows.pop().unwrap()),
        _ => {
            let dims = dims.to_vec();
            let inputs: Vec<Box<dyn Node>> = per_aggregation_rows
                .into_iter()
                .map(|rows| Box::new(VecSource::new(rows)) as Box<dyn Node>)
                .collect();
            let mut merged = MergeReducer::new(
                inputs,
                move |r: &Record| project_key(r, &dims),
                |a: Record, b: Record| a.merge(&b),
            );
            let mut out = Vec::new();
            loop {
                match merged.produce().context(error::ReducerSnafu)? {
                    Produced::Item(r) => out.push(r),
                    Produced::EndOfStream => break,
                    // `VecSource` inputs are never suspended by anything in
                    // this pipeline; treat it as an internal invariant
                    // violation rather than silently dropping output.
                    Produced::Suspended => {
                        return Err(reducer::Error::Cancelled).context(error::ReducerSnafu)
                    }
                }
            }
            Ok(out)
        }
    }
}

fn apply_computed_measures(schema: &Schema, requested: &[String], row: &mut Record) {
    for measure in requested {
        if row.get(measure).is_some() {
            continue;
        }
        if let Some(computed) = schema.computed_measures.get(measure) {
            let resolved: BTreeMap<String, Value> = computed
                .deps
                .iter()
                .filter_map(|d| row.get(d).map(|v| (d.clone(), v.clone())))
                .collect();
            if let Some(value) = computed.evaluate(&resolved) {
                *row = std::mem::take(row).with_field(measure.clone(), value);
            }
        }
    }
}

/// Totals over the same measures, reduced with each measure's own
/// aggregator starting from `zero`. Reduces already-finalised per-row
/// values rather than raw ingest records, so a `Last` total just picks an
/// arbitrary one of the tied rows — acceptable for SUM/MIN/MAX/HLL
/// totals, a known simplification for `Last` recorded in `DESIGN.md`.
fn compute_totals(schema: &Schema, requested: &[String], rows: &[Record]) -> Record {
    let at = Time::from_timestamp_millis(0);
    let mut totals = Record::new();
    for measure in requested {
        let Some(stored) = schema.measures.get(measure) else { continue };
        let mut acc = stored.aggregator.zero();
        for row in rows {
            if let Some(v) = row.get(measure) {
                acc = stored.aggregator.reduce_value(&acc, at, v);
            }
        }
        if let Ok(value) = stored.aggregator.finalize(&acc) {
            totals = totals.with_field(measure.clone(), value);
        }
    }
    for measure in requested {
        if schema.measures.contains_key(measure) {
            continue;
        }
        if let Some(computed) = schema.computed_measures.get(measure) {
            let resolved: BTreeMap<String, Value> = computed
                .deps
                .iter()
                .filter_map(|d| totals.get(d).map(|v| (d.clone(), v.clone())))
                .collect();
            if let Some(value) = computed.evaluate(&resolved) {
                totals = totals.with_field(measure.clone(), value);
            }
        }
    }
    totals
}

async fn resolve_attributes(
    resolver: &dyn AttributeResolver,
    rows: Vec<Record>,
    requested_attributes: &[String],
) -> Vec<Record> {
    let wanted: BTreeSet<&String> = requested_attributes
        .iter()
        .filter(|a| resolver.attribute_types().contains_key(*a))
        .collect();
    if wanted.is_empty() {
        return rows;
    }
    let keys: Vec<Vec<Value>> = rows
        .iter()
        .map(|r| resolver.key_dimensions().iter().map(|d| r.get(d).cloned().unwrap_or(Value::Bool(false))).collect())
        .collect();
    let resolved = resolver.resolve(keys).await;
    rows.into_iter()
        .zip(resolved)
        .map(|(mut row, attrs)| {
            for (name, value) in attrs {
                if wanted.contains(&name) {
                    row = row.with_field(name, value);
                }
            }
            row
        })
        .collect()
}
