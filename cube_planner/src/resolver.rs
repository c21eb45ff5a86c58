//! The `AttributeResolver` collaborator (§6): resolves attributes that
//! live outside the cube's own dimensions (e.g. a denormalised lookup
//! service), keyed on one or more dimension values. Always asynchronous
//! from the planner's point of view (§5) — this is the one suspension
//! point the planner itself can hit.

use async_trait::async_trait;
use predicate::{FieldType, Value};
use std::collections::BTreeMap;

/// Resolves a batch of dimension-key tuples to attribute values in one
/// round trip, rather than the source's per-key callback protocol
/// (`resolve(keys, key_fn, apply_fn) -> completion`) — batching the keys
/// into a single `Vec` and returning a `Vec` of results is the idiomatic
/// async-Rust equivalent and avoids a bespoke completion-callback type.
#[async_trait]
pub trait AttributeResolver: std::fmt::Debug + Send + Sync {
    /// The dimensions this resolver needs as a lookup key, in order.
    fn key_dimensions(&self) -> &[String];

    /// The attributes this resolver can produce, and their types.
    fn attribute_types(&self) -> &BTreeMap<String, FieldType>;

    /// Resolve one attribute row per entry in `keys`, in the same order.
    /// A resolver that has nothing for a given key returns an empty map
    /// for that entry rather than failing the whole batch.
    async fn resolve(&self, keys: Vec<Vec<Value>>) -> Vec<BTreeMap<String, Value>>;
}
