//! The `ChunkStorage` collaborator (§6): durable home for one chunk's raw
//! bytes, keyed by chunk id.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::use_self)]

use async_trait::async_trait;
use parking_lot::Mutex;
use snafu::Snafu;
use std::collections::HashMap;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum Error {
    #[snafu(display("no chunk stored under id {id}"))]
    NotFound { id: u64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Write/read/delete a chunk's bytes by id. Reads return the full payload
/// rather than a true streaming transport: remote-chunk transport is out
/// of scope (§1 Non-goals), and the in-memory reference tier has no
/// partial-read story to offer beyond what `chunk_store::ChunkReader`
/// already does once bytes are resident.
#[async_trait]
pub trait ChunkStorage: std::fmt::Debug + Send + Sync {
    async fn write(&self, id: u64, bytes: Vec<u8>) -> Result<()>;
    async fn read(&self, id: u64) -> Result<Vec<u8>>;
    async fn delete(&self, id: u64) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryChunkStorage {
    chunks: Mutex<HashMap<u64, Vec<u8>>>,
}

impl InMemoryChunkStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStorage for InMemoryChunkStorage {
    async fn write(&self, id: u64, bytes: Vec<u8>) -> Result<()> {
        self.chunks.lock().insert(id, bytes);
        Ok(())
    }

    async fn read(&self, id: u64) -> Result<Vec<u8>> {
        self.chunks
            .lock()
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound { id })
    }

    async fn delete(&self, id: u64) -> Result<()> {
        self.chunks.lock().remove(&id);
        Ok(())
    }
}
