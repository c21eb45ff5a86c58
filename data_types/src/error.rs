use snafu::Snafu;

/// Errors raised by schema-level invariants (chunk metadata, aggregator
/// finalisation). Component-specific errors (codec, query, plan,
/// consolidation) live in their owning crates per §7.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum Error {
    #[snafu(display("chunk {id} has min_key > max_key"))]
    MinKeyAfterMaxKey { id: u64 },

    #[snafu(display("chunk {id} has count {count}, must be >= 1"))]
    EmptyChunk { id: u64 },

    #[snafu(display("finalize called on an empty accumulator"))]
    EmptyAccumulator,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
