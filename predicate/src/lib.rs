//! Symbolic predicate algebra over typed dimension values (§4.2).
//!
//! [`AggregationPredicate`] is the AND/OR/EQ/BETWEEN/IN/NOT tree used to
//! describe both stored aggregations (which dimension values they cover)
//! and query filters. [`AggregationPredicate::simplify`] is the canonical
//! form both the aggregation-selection cost model and the `fully_specified`
//! key-range derivation depend on being idempotent.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self
)]

mod algebra;
mod value;

pub use algebra::AggregationPredicate;
pub use value::{FieldType, Fields, Value};
