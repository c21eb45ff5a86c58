use buffer_pool::CodecError;
use snafu::Snafu;

/// Errors from writing or reading one chunk's bytes (§4.4/§7). Codec
/// errors from a corrupt chunk are local to that chunk's reader; whether
/// they propagate or degrade to end-of-stream is the
/// `ignore_chunk_reading_exceptions` flag's call, made by [`crate::reader::ChunkReader`].
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum Error {
    #[snafu(display("chunk read failed: {source}"))]
    Read { source: CodecError },

    #[snafu(display("chunk write failed: {source}"))]
    Write { source: CodecError },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
