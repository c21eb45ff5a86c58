//! The on-disk chunk format (§4.4): a short header followed by a
//! concatenation of records, each written as a sequence of primitive codec
//! writes in dimension order then measure order. Changing these bytes is a
//! schema-version bump — see §6.

use crate::row::Row;
use buffer_pool::codec::{self, CodecError, Result};
use buffer_pool::ByteBuf;
use predicate::{FieldType, Value};

pub const MAGIC: u32 = 0x4B43_5542; // "KCUB" in ASCII, arbitrary but fixed
pub const VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub aggregation_schema_hash: u64,
    pub count: u32,
}

pub fn put_header(buf: &mut ByteBuf, header: &ChunkHeader) {
    codec::put_u32(buf, MAGIC);
    codec::put_i16(buf, VERSION as i16);
    codec::put_u64(buf, header.aggregation_schema_hash);
    codec::put_u32(buf, header.count);
}

pub fn get_header(buf: &mut ByteBuf) -> Result<ChunkHeader> {
    let magic = codec::get_u32(buf)?;
    if magic != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let version = codec::get_i16(buf)? as u16;
    if version != VERSION {
        return Err(CodecError::BadMagic);
    }
    let aggregation_schema_hash = codec::get_u64(buf)?;
    let count = codec::get_u32(buf)?;
    Ok(ChunkHeader {
        aggregation_schema_hash,
        count,
    })
}

/// Fixed header size in bytes: `u32 + i16 + u64 + u32`.
pub const HEADER_SIZE: usize = 4 + 2 + 8 + 4;

pub fn put_value(buf: &mut ByteBuf, v: &Value) {
    match v {
        Value::I32(x) => codec::put_i32(buf, *x),
        Value::I64(x) => codec::put_i64(buf, *x),
        Value::F32(x) => codec::put_f32(buf, x.into_inner()),
        Value::F64(x) => codec::put_f64(buf, x.into_inner()),
        Value::Bool(x) => codec::put_bool(buf, *x),
        Value::Utf8(s) => codec::put_utf8(buf, s),
    }
}

pub fn get_value(buf: &mut ByteBuf, field_type: FieldType) -> Result<Value> {
    Ok(match field_type {
        FieldType::I32 => Value::i32(codec::get_i32(buf)?),
        FieldType::I64 => Value::i64(codec::get_i64(buf)?),
        FieldType::F32 => Value::f32(codec::get_f32(buf)?),
        FieldType::F64 => Value::f64(codec::get_f64(buf)?),
        FieldType::Bool => Value::Bool(codec::get_bool(buf)?),
        FieldType::Utf8 => Value::utf8(codec::get_utf8(buf)?),
    })
}

/// Exact number of bytes `v` will occupy once encoded.
pub fn value_encoded_size(v: &Value) -> usize {
    match v {
        Value::I32(_) | Value::F32(_) => 4,
        Value::I64(_) | Value::F64(_) => 8,
        Value::Bool(_) => 1,
        Value::Utf8(s) => varint_len(s.len() as u32) + s.len(),
    }
}

fn varint_len(mut v: u32) -> usize {
    let mut n = 1;
    while v >= 0x80 {
        v >>= 7;
        n += 1;
    }
    n
}

pub fn row_encoded_size(row: &Row) -> usize {
    row.key
        .iter()
        .chain(row.measures.iter())
        .map(value_encoded_size)
        .sum()
}

pub fn put_row(buf: &mut ByteBuf, row: &Row, key_types: &[FieldType], measure_types: &[FieldType]) {
    debug_assert_eq!(row.key.len(), key_types.len());
    debug_assert_eq!(row.measures.len(), measure_types.len());
    for v in &row.key {
        put_value(buf, v);
    }
    for v in &row.measures {
        put_value(buf, v);
    }
}

pub fn get_row(buf: &mut ByteBuf, key_types: &[FieldType], measure_types: &[FieldType]) -> Result<Row> {
    let key = key_types
        .iter()
        .map(|t| get_value(buf, *t))
        .collect::<Result<Vec<_>>>()?;
    let measures = measure_types
        .iter()
        .map(|t| get_value(buf, *t))
        .collect::<Result<Vec<_>>>()?;
    Ok(Row { key, measures })
}
