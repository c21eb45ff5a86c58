//! Re-exports the tracing ecosystem at a single pinned version so every
//! crate in the workspace logs through the same macros without each one
//! picking its own `tracing` version.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]

pub use tracing::{debug, error, info, span, trace, warn, Level};
