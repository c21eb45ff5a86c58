//! Chunk reader (§4.4): a lazy forward-only stream over `(chunk, range)`.
//! Restartable only by constructing a fresh reader over the same bytes.

use crate::wire::{self, ChunkHeader};
use crate::row::Row;
use buffer_pool::codec::CodecError;
use buffer_pool::ByteBuf;
use predicate::{FieldType, Value};

#[derive(Debug)]
pub struct ChunkReader {
    buf: ByteBuf,
    remaining: u32,
    key_types: Vec<FieldType>,
    measure_types: Vec<FieldType>,
    range: (Vec<Value>, Vec<Value>),
    ignore_chunk_reading_exceptions: bool,
    exhausted: bool,
}

impl ChunkReader {
    /// Construct a reader over `buf`, validating the header's magic,
    /// version, and schema hash up front.
    pub fn new(
        mut buf: ByteBuf,
        key_types: Vec<FieldType>,
        measure_types: Vec<FieldType>,
        expected_schema_hash: u64,
        range: (Vec<Value>, Vec<Value>),
        ignore_chunk_reading_exceptions: bool,
    ) -> Result<Self, CodecError> {
        let ChunkHeader {
            aggregation_schema_hash,
            count,
        } = wire::get_header(&mut buf)?;
        if aggregation_schema_hash != expected_schema_hash {
            return Err(CodecError::SchemaHashMismatch);
        }
        Ok(Self {
            buf,
            remaining: count,
            key_types,
            measure_types,
            range,
            ignore_chunk_reading_exceptions,
            exhausted: false,
        })
    }

    fn in_range(&self, key: &[Value]) -> bool {
        key >= self.range.0.as_slice() && key <= self.range.1.as_slice()
    }
}

/// Yields `Ok(row)` for each row in `range`, `Err` once if a corrupt chunk
/// is hit and `ignore_chunk_reading_exceptions` is false, or ends the
/// stream silently (after logging) if it is true (§4.4/§7).
impl Iterator for ChunkReader {
    type Item = Result<Row, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.exhausted || self.remaining == 0 {
                return None;
            }
            match wire::get_row(&mut self.buf, &self.key_types, &self.measure_types) {
                Ok(row) => {
                    self.remaining -= 1;
                    if self.remaining == 0 {
                        self.exhausted = true;
                    }
                    if self.in_range(&row.key) {
                        return Some(Ok(row));
                    }
                }
                Err(e) => {
                    self.exhausted = true;
                    if self.ignore_chunk_reading_exceptions {
                        telemetry::warn!(error = %e, "corrupt chunk read; ending stream early");
                        return None;
                    }
                    return Some(Err(e));
                }
            }
        }
    }
}
