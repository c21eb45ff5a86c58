//! Cube-wide schema types shared by every other crate (§3): `FieldType`
//! and `Value` (re-exported from [`predicate`]), `Aggregator` and its
//! reserved implementations, `Record`, `AggregationConfig`, `ChunkMeta`,
//! and the `Schema` that ties them together.
//!
//! `FieldType`/`Value` live in [`predicate`] rather than here: the natural
//! direction (this crate depending on `predicate`) would otherwise become
//! circular once `AggregationConfig` embeds an `AggregationPredicate`, so
//! the shared value model sits below both.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self
)]

mod aggregator;
mod chunk;
mod config;
mod error;
mod record;
mod schema;

pub use aggregator::{Accumulator, Aggregator, Hll, HyperLogPlusPlus, Last, Max, Min, SumF64, SumI64};
pub use chunk::ChunkMeta;
pub use config::AggregationConfig;
pub use error::{Error, Result};
pub use predicate::{FieldType, Value};
pub use record::Record;
pub use schema::{ComputedMeasure, Measure, Schema};
