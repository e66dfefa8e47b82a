//! Vector collection abstraction.
//!
//! The [`VectorStore`] trait covers the four operations the upload driver and
//! search need: make sure the collection exists, upsert points, switch the
//! index between bulk-load and query-ready, and nearest-neighbour search.
//!
//! Backends:
//! - [`qdrant::QdrantStore`] talks to Qdrant over REST.
//! - [`memory::MemoryVectorStore`] keeps everything in process; used for
//!   offline runs and tests.

pub mod memory;
pub mod qdrant;

use anyhow::{bail, Result};
use async_trait::async_trait;
use lead_ingest_core::PersonRecord;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::VectorStoreConfig;

/// One stored person: content-addressed id, embedding and the full record.
#[derive(Debug, Clone)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: PersonRecord,
}

/// HNSW graph setting for the collection.
///
/// Uploads run with graph construction off; once every file is in, the
/// graph is built for querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPhase {
    BulkLoad,
    QueryReady,
}

impl IndexPhase {
    /// HNSW `m` (edges per node) for this phase.
    pub fn hnsw_m(self) -> u32 {
        match self {
            IndexPhase::BulkLoad => 0,
            IndexPhase::QueryReady => 16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: Uuid,
    pub score: f32,
    pub payload: PersonRecord,
}

/// Storage backend for person vectors.
///
/// Upserts are idempotent by id: writing the same id twice leaves one point
/// holding the later write.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection for `dims`-wide cosine vectors if it does not
    /// exist. New collections start in [`IndexPhase::BulkLoad`]. Returns
    /// whether a collection was created.
    async fn ensure_collection(&self, dims: usize) -> Result<bool>;

    /// Insert or overwrite points. May return before the points are
    /// searchable.
    async fn upsert(&self, points: Vec<Point>) -> Result<()>;

    async fn set_index_phase(&self, phase: IndexPhase) -> Result<()>;

    /// Up to `limit` points closest to `vector`, best first.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>>;
}

/// Create the backend named by `config.backend`.
pub fn create_store(config: &VectorStoreConfig) -> Result<Arc<dyn VectorStore>> {
    match config.backend.as_str() {
        "qdrant" => Ok(Arc::new(qdrant::QdrantStore::new(config)?)),
        "memory" => Ok(Arc::new(memory::MemoryVectorStore::new())),
        other => bail!("Unknown vector store backend: {}", other),
    }
}
