//! Backpressured stream graph (C7, §4.7): a splitter, mapper/filter, and
//! k-way merge reducer, each a pull-based [`Node`] wired together by the
//! cube planner. Everything here runs on the single cooperative executor
//! task (§5); no type in this crate is `Send`.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::use_self)]

mod error;
mod mapper;
mod merge;
mod node;
mod source;
mod splitter;

pub use error::{Error, Result};
pub use mapper::Mapper;
pub use merge::MergeReducer;
pub use node::{Node, Produced};
pub use source::VecSource;
pub use splitter::{split, SplitterTap};
