//! The `MetadataStore` collaborator (§6): chunk id allocation, revisioned
//! chunk loading, and the exclusive consolidation claim/swap protocol.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::use_self)]

mod error;
mod in_memory;

pub use error::{Error, Result};
pub use in_memory::InMemoryMetadataStore;

use async_trait::async_trait;
use data_types::ChunkMeta;

/// All operations are transactional from the caller's point of view (§6).
#[async_trait]
pub trait MetadataStore: std::fmt::Debug + Send + Sync {
    /// Allocate a fresh chunk id, reserved before any bytes are written.
    async fn create_chunk_id(&self) -> u64;

    /// All live chunks for `aggregation_id` with `revision >=
    /// since_revision`. Concurrent calls for the same aggregation are
    /// coalesced into a single underlying load (§5).
    async fn load_chunks(&self, aggregation_id: &str, since_revision: u64) -> Vec<ChunkMeta>;

    /// Atomically publish newly-sealed chunks into the aggregation's
    /// revision (ingest's commit path).
    async fn publish_chunks(&self, aggregation_id: &str, chunks: Vec<ChunkMeta>) -> Result<()>;

    /// Exclusively claim `chunks` for consolidation. Fails with
    /// `Error::ClaimConflict` if any is already claimed.
    async fn start_consolidation(&self, aggregation_id: &str, chunks: &[u64]) -> Result<()>;

    /// Atomically retire `original` and publish `replacement`, releasing
    /// the claim. Called only after a successful `start_consolidation`.
    async fn save_consolidated_chunks(
        &self,
        aggregation_id: &str,
        original: &[u64],
        replacement: Vec<ChunkMeta>,
    ) -> Result<()>;

    /// Release a consolidation claim without publishing a replacement —
    /// the rollback path on any failure after `start_consolidation` (§4.5).
    async fn release_claim(&self, aggregation_id: &str, chunks: &[u64]);
}
