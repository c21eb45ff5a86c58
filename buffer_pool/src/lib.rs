//! Pooled binary buffers and the primitive/varint codec contract (§4.1).
//!
//! This crate eliminates per-operation allocation on the hot serialisation
//! path shared by the chunk writer, reader, and external sorter: a
//! size-classed [`Pool`] of byte arrays, a [`ByteBuf`] cursor over a pooled
//! array with ref-counted slices, and the primitive/varint encode/decode
//! functions the wire format is built from.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

mod byte_buf;
pub mod codec;
pub mod pool;
mod text;

pub use byte_buf::{reallocate_at_least, ByteBuf};
pub use codec::CodecError;
pub use pool::Pool;
pub use text::AppendableText;
