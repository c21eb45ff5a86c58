use snafu::Snafu;

/// Errors from the metadata store collaborator (§6/§7). `StoreError` in the
/// spec's vocabulary; named for the operation it guards here since every
/// call site already knows which operation failed.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum Error {
    #[snafu(display("consolidation claim conflict: one or more chunks are already claimed"))]
    ClaimConflict,

    #[snafu(display("unknown aggregation id {aggregation_id}"))]
    UnknownAggregation { aggregation_id: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
