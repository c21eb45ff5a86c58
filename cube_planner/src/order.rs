//! Ordering, limit, and offset (§4.6). Orderings pinned to a single value
//! by a fully-specified `where` clause carry no information and are
//! elided; everything else is a stable sort in request order. This
//! reference engine sorts the whole result set rather than doing a
//! partial top-k selection — simple and correct, just not optimal for a
//! small `limit` against a very large result set.

use crate::query::OrderBy;
use data_types::Record;
use predicate::AggregationPredicate;

/// Drop orderings on columns the `where` clause already pins to a single
/// value — sorting on them would be a no-op.
pub fn effective_orderings(where_: &AggregationPredicate, orderings: &[OrderBy]) -> Vec<OrderBy> {
    let pinned = where_.fully_specified();
    orderings
        .iter()
        .filter(|o| !pinned.contains_key(&o.column))
        .cloned()
        .collect()
}

pub fn sort_rows(rows: &mut [Record], orderings: &[OrderBy]) {
    if orderings.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for ordering in orderings {
            let av = a.get(&ordering.column);
            let bv = b.get(&ordering.column);
            let cmp = av.cmp(&bv);
            let cmp = if ordering.descending { cmp.reverse() } else { cmp };
            if cmp != std::cmp::Ordering::Equal {
                return cmp;
            }
        }
        std::cmp::Ordering::Equal
    });
}

/// `offset >= len` yields an empty slice; otherwise `[offset, offset + limit)`
/// clamped to the available rows.
pub fn paginate(rows: Vec<Record>, offset: usize, limit: usize) -> Vec<Record> {
    if offset >= rows.len() {
        return Vec::new();
    }
    let end = offset.saturating_add(limit).min(rows.len());
    rows[offset..end].to_vec()
}
