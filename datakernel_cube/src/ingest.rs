//! Ingest routing (§1, §4.7): one C7 splitter tap per aggregation, each
//! tap drained fully and handed to that aggregation's own `consume`,
//! which applies its predicate/key/measure acceptance filter. The
//! splitter's all-or-nothing backpressure is unused here — every tap is
//! drained to end-of-stream before the next one starts — but it is the
//! same fan-out primitive a streaming ingest session would suspend and
//! resume per tap.

use crate::error::{self, Result};
use aggregation::AggregationEngine;
use data_types::{ChunkMeta, Record};
use reducer::{split, Node, Produced, VecSource};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::sync::Arc;

pub(crate) async fn ingest(
    aggregations: &BTreeMap<String, Arc<AggregationEngine>>,
    records: Vec<Record>,
) -> Result<Vec<ChunkMeta>> {
    if aggregations.is_empty() {
        return Ok(Vec::new());
    }

    let source = VecSource::new(records);
    let taps = split(Box::new(source), aggregations.len());

    let mut metas = Vec::new();
    for (mut tap, engine) in taps.into_iter().zip(aggregations.values()) {
        let mut batch = Vec::new();
        loop {
            match tap.produce().context(error::ReducerSnafu)? {
                Produced::Item(record) => batch.push(record),
                Produced::EndOfStream => break,
                // No tap is ever suspended by this routine; treat it as
                // an invariant violation rather than spinning forever.
                Produced::Suspended => {
                    return Err(reducer::Error::Cancelled).context(error::ReducerSnafu)
                }
            }
        }
        metas.extend(engine.consume(batch).await.context(error::AggregationSnafu)?);
    }
    Ok(metas)
}
