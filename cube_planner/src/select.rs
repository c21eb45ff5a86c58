//! Compatible-measure derivation and aggregation selection (§4.6).

use crate::error::{self, Result};
use aggregation::AggregationEngine;
use data_types::Schema;
use predicate::AggregationPredicate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A stored measure `m` is compatible with `(dims, where)` if some
/// aggregation's key set covers `dims` and stores `m`. A computed measure
/// is compatible iff every stored measure it depends on is.
pub fn compatible_measures(
    schema: &Schema,
    aggregations: &BTreeMap<String, Arc<AggregationEngine>>,
    dims: &BTreeSet<String>,
    requested: &[String],
) -> (Vec<String>, Vec<String>) {
    let stored_is_compatible = |measure: &str| -> bool {
        aggregations.values().any(|a| {
            dims.iter().all(|d| a.config().keys.iter().any(|k| k == d))
                && a.config().measures.iter().any(|m| m == measure)
        })
    };

    let mut compatible = Vec::new();
    let mut dropped = Vec::new();
    for measure in requested {
        let ok = if let Some(computed) = schema.computed_measures.get(measure) {
            computed.deps.iter().all(|dep| stored_is_compatible(dep))
        } else {
            stored_is_compatible(measure)
        };
        if ok {
            compatible.push(measure.clone());
        } else {
            dropped.push(measure.clone());
        }
    }
    (compatible, dropped)
}

/// The stored measures a set of requested (and already-filtered-compatible)
/// measures actually needs fetched from aggregations — computed measures
/// expand to their dependencies.
pub fn required_stored_measures(schema: &Schema, requested: &[String]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for measure in requested {
        match schema.computed_measures.get(measure) {
            Some(computed) => out.extend(computed.deps.iter().cloned()),
            None => {
                out.insert(measure.clone());
            }
        }
    }
    out
}

/// One chosen aggregation and the stored measures it was asked to cover.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub aggregation_id: String,
    pub measures: Vec<String>,
}

/// Greedy cost-ranked coverage (§4.6): candidates are every aggregation
/// whose keys cover `dims` and whose own predicate isn't contradicted by
/// `where_`, ranked by `estimate_cost` ascending (ties by id), each
/// assigned whatever of `pending` it still covers until `pending` is
/// empty or candidates run out. Returns the assignments plus whatever of
/// `pending` no candidate could cover (the incomplete-plan case). Fails
/// with `PlanError::NoCoveringAggregation` (§7) when not even one
/// aggregation's keys cover `dims` — there is then no data source at all
/// to plan against, as opposed to a data source existing but missing
/// some of the requested measures.
pub fn select_aggregations(
    aggregations: &BTreeMap<String, Arc<AggregationEngine>>,
    dims: &BTreeSet<String>,
    where_: &AggregationPredicate,
    pending: &BTreeSet<String>,
) -> Result<(Vec<Assignment>, Vec<String>)> {
    let mut candidates: Vec<&Arc<AggregationEngine>> = aggregations
        .values()
        .filter(|a| dims.iter().all(|d| a.config().keys.iter().any(|k| k == d)))
        .filter(|a| {
            AggregationPredicate::and([a.config().predicate.clone(), where_.clone()]).simplify()
                != AggregationPredicate::AlwaysFalse
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.estimate_cost(where_)
            .cmp(&b.estimate_cost(where_))
            .then_with(|| a.id().cmp(b.id()))
    });

    if candidates.is_empty() {
        return error::NoCoveringAggregationSnafu { dims: dims.iter().cloned().collect::<Vec<_>>() }.fail();
    }

    if pending.is_empty() {
        // Dims-only query: no measure needs fetching, but a data source is
        // still needed to enumerate the distinct dimension combinations.
        return Ok((
            vec![Assignment { aggregation_id: candidates[0].id().to_string(), measures: Vec::new() }],
            Vec::new(),
        ));
    }

    let mut pending: BTreeSet<String> = pending.clone();
    let mut assignments = Vec::new();
    for agg in candidates {
        if pending.is_empty() {
            break;
        }
        let covered: Vec<String> = agg
            .config()
            .measures
            .iter()
            .filter(|m| pending.contains(*m))
            .cloned()
            .collect();
        if covered.is_empty() {
            continue;
        }
        for m in &covered {
            pending.remove(m);
        }
        assignments.push(Assignment { aggregation_id: agg.id().to_string(), measures: covered });
    }

    Ok((assignments, pending.into_iter().collect()))
}
