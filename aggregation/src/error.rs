use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("aggregation {id} does not cover dimension {dim}"))]
    UnsupportedDimension { id: String, dim: String },

    #[snafu(display("aggregation {id} does not cover measure {measure}"))]
    UnsupportedMeasure { id: String, measure: String },

    #[snafu(display("corrupt chunk {chunk_id}: {source}"))]
    ChunkRead {
        chunk_id: u64,
        source: buffer_pool::CodecError,
    },

    #[snafu(display("chunk storage error for chunk {chunk_id}: {source}"))]
    ChunkStorage {
        chunk_id: u64,
        source: chunk_storage::Error,
    },

    #[snafu(display("metadata store error: {source}"))]
    MetadataStore { source: metadata_store::Error },

    #[snafu(display(
        "consolidation of aggregation {aggregation_id} conflicts with another in-flight consolidation"
    ))]
    ConsolidationClaimConflict { aggregation_id: String },

    #[snafu(display("failed to finalize measure {measure}: {source}"))]
    MeasureFinalize {
        measure: String,
        source: data_types::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
