//! Chunk writer (§4.4): accumulates rows through the external sorter,
//! then cuts sealed chunk payloads at `chunk_size` on a `partitioning_key`
//! boundary.

use crate::row::Row;
use crate::sorter::ExternalSorter;
use crate::wire::{self, ChunkHeader};
use buffer_pool::pool::GLOBAL;
use buffer_pool::ByteBuf;
use data_types::AggregationConfig;
use predicate::{FieldType, Value};

/// One sealed, still-unpublished chunk: its encoded bytes plus the
/// metadata the caller needs to allocate an id and publish it.
#[derive(Debug)]
pub struct SealedChunk {
    pub min_key: Vec<Value>,
    pub max_key: Vec<Value>,
    pub count: u64,
    pub bytes: ByteBuf,
}

#[derive(Debug)]
pub struct ChunkWriter<'a> {
    config: &'a AggregationConfig,
    key_types: Vec<FieldType>,
    measure_types: Vec<FieldType>,
    schema_hash: u64,
    sorter: ExternalSorter,
}

impl<'a> ChunkWriter<'a> {
    pub fn new(
        config: &'a AggregationConfig,
        key_types: Vec<FieldType>,
        measure_types: Vec<FieldType>,
        schema_hash: u64,
    ) -> Self {
        Self {
            sorter: ExternalSorter::new(config.sorter_items_in_memory),
            config,
            key_types,
            measure_types,
            schema_hash,
        }
    }

    pub fn push(&mut self, row: Row) {
        self.sorter.push(row);
    }

    /// Finish the write, producing sealed chunk payloads cut at
    /// `chunk_size` on a `partitioning_key` boundary (§4.4): a boundary is
    /// only taken once the accumulated size reaches `chunk_size` *and* the
    /// next row's partitioning-key prefix differs from the current one.
    pub fn finish(self) -> Vec<SealedChunk> {
        let rows = self.sorter.finish();
        let partition_len = self.config.partitioning_key.len();
        let mut sealed = Vec::new();
        let mut current: Vec<Row> = Vec::new();
        let mut current_bytes = 0usize;

        for row in rows {
            let crosses_partition_boundary = match current.last() {
                Some(last) => last.key[..partition_len] != row.key[..partition_len],
                None => false,
            };
            if current_bytes >= self.config.chunk_size && crosses_partition_boundary {
                sealed.push(self.seal(std::mem::take(&mut current)));
                current_bytes = 0;
            }
            current_bytes += wire::row_encoded_size(&row);
            current.push(row);
        }
        if !current.is_empty() {
            sealed.push(self.seal(current));
        }
        sealed
    }

    fn seal(&self, rows: Vec<Row>) -> SealedChunk {
        let min_key = rows.first().expect("non-empty run").key.clone();
        let max_key = rows.last().expect("non-empty run").key.clone();
        let count = rows.len() as u64;

        let payload_size: usize = rows.iter().map(wire::row_encoded_size).sum();
        let mut buf = ByteBuf::allocate_at_least(&GLOBAL, wire::HEADER_SIZE + payload_size);
        wire::put_header(
            &mut buf,
            &ChunkHeader {
                aggregation_schema_hash: self.schema_hash,
                count: count as u32,
            },
        );
        for row in &rows {
            wire::put_row(&mut buf, row, &self.key_types, &self.measure_types);
        }

        SealedChunk {
            min_key,
            max_key,
            count,
            bytes: buf,
        }
    }
}
