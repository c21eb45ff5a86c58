//! Typed dimension/measure values shared by the predicate algebra, the
//! codec, and the aggregator contract.

use ordered_float::OrderedFloat;
use std::fmt;

/// The serialised/in-memory type of a dimension or measure column.
///
/// Carries the comparator (via [`Value`]'s own `Ord` impl) and the hash
/// (via `Hash`) the spec asks `FieldType` to provide — in Rust those are
/// properties of `Value` itself rather than a separate capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldType {
    I32,
    I64,
    F32,
    F64,
    Bool,
    Utf8,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Utf8 => "utf8",
        };
        f.write_str(s)
    }
}

/// A single typed value, comparable and hashable so it can be used as a
/// dimension key, a predicate literal, or an aggregator accumulator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(OrderedFloat<f32>),
    F64(OrderedFloat<f64>),
    Bool(bool),
    Utf8(String),
}

impl Value {
    /// The [`FieldType`] this value belongs to.
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::I32(_) => FieldType::I32,
            Self::I64(_) => FieldType::I64,
            Self::F32(_) => FieldType::F32,
            Self::F64(_) => FieldType::F64,
            Self::Bool(_) => FieldType::Bool,
            Self::Utf8(_) => FieldType::Utf8,
        }
    }

    pub fn i32(v: i32) -> Self {
        Self::I32(v)
    }

    pub fn i64(v: i64) -> Self {
        Self::I64(v)
    }

    pub fn f32(v: f32) -> Self {
        Self::F32(OrderedFloat(v))
    }

    pub fn f64(v: f64) -> Self {
        Self::F64(OrderedFloat(v))
    }

    pub fn utf8(v: impl Into<String>) -> Self {
        Self::Utf8(v.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
        }
    }
}

/// Anything `matches`/`fullySpecified` can look a dimension's value up on.
/// `data_types::Record` implements this; keeping it a trait here (rather
/// than depending on `data_types::Record` directly) avoids a dependency
/// cycle, since `data_types` builds its schema model on top of this crate.
pub trait Fields {
    fn field(&self, name: &str) -> Option<&Value>;
}
