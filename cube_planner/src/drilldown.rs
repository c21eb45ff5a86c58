//! Drill-down synthesis (§4.6): aggregations whose key set strictly
//! refines the dimensions already in the query are surfaced as
//! suggestions for "what could I ask next". Shorter chains that are a
//! prefix of a longer one are dropped in favour of the longer chain —
//! a caller who can drill down three levels doesn't need to be told
//! about the one-level drill-down too.

use crate::query::DrillDown;
use aggregation::AggregationEngine;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub fn synthesize_drill_downs(
    aggregations: &BTreeMap<String, Arc<AggregationEngine>>,
    full_dims: &BTreeSet<String>,
) -> Vec<DrillDown> {
    let mut candidates: Vec<DrillDown> = Vec::new();
    for agg in aggregations.values() {
        let keys = &agg.config().keys;
        if !full_dims.iter().all(|d| keys.iter().any(|k| k == d)) {
            continue;
        }
        let extra: Vec<String> = keys.iter().filter(|k| !full_dims.contains(*k)).cloned().collect();
        if extra.is_empty() {
            continue;
        }
        candidates.push(DrillDown { aggregation_id: agg.id().to_string(), chain: extra });
    }

    candidates
        .iter()
        .filter(|c| {
            !candidates
                .iter()
                .any(|other| other.chain.len() > c.chain.len() && other.chain.starts_with(&c.chain[..]))
        })
        .cloned()
        .collect()
}
