//! Per-aggregation chunk storage mechanics (C3/C4, §4.3-§4.4): the chunk
//! index, the on-disk wire format, the chunk reader/writer, and the
//! external k-way-merge sorter. One aggregation engine instance owns one
//! [`index::ChunkIndex`] plus the writer/reader pair that reads and
//! writes through it.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self
)]

pub mod error;
pub mod index;
pub mod reader;
pub mod row;
pub mod sorter;
pub mod wire;
pub mod writer;

pub use error::Error;
pub use index::{ChunkIndex, ConsolidationStrategy};
pub use reader::ChunkReader;
pub use row::Row;
pub use sorter::ExternalSorter;
pub use writer::{ChunkWriter, SealedChunk};
