//! # lead-ingest
//!
//! Resumable bulk loader for people-data CSV exports.
//!
//! Walks a directory tree of CSV files, streams each file row by row, maps
//! every row onto the fixed 36-field person schema, validates it, derives a
//! content-addressed id, embeds the record and upserts it into a vector
//! collection. File-level checkpoints make the job resumable: a re-run skips
//! every file that already completed.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌─────────────┐   ┌────────────┐
//! │ Scanner  │──▶│ CSV stream │──▶│  Batching   │──▶│  Uploader  │
//! │ walkdir  │   │ + validate │   │ + semaphore │   │embed+upsert│
//! └──────────┘   └────────────┘   └─────────────┘   └─────┬──────┘
//!                                                         │
//!                                     ┌───────────────────┤
//!                                     ▼                   ▼
//!                               ┌──────────┐        ┌──────────┐
//!                               │  Qdrant  │        │checkpoint│
//!                               │ / memory │        │   JSON   │
//!                               └──────────┘        └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`scanner`] | Recursive CSV discovery |
//! | [`csv_stream`] | Streaming parse, header mapping, row validation |
//! | [`batch`] | Batching and bounded-concurrency execution |
//! | [`checkpoint`] | File-level upload checkpoints |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`rerank`] | Jina reranking client |
//! | [`vector_store`] | Vector collection backends |
//! | [`upload`] | Upload orchestration |
//! | [`inspect`] | Offline scan, validate and checkpoint commands |
//! | [`search`] | Query-time semantic search |
//! | [`progress`] | Progress reporting on stderr |
//!
//! Schema, header mapping and identity live in the `lead-ingest-core` crate.

pub mod batch;
pub mod checkpoint;
pub mod config;
pub mod csv_stream;
pub mod embedding;
pub mod http;
pub mod inspect;
pub mod progress;
pub mod rerank;
pub mod scanner;
pub mod search;
pub mod upload;
pub mod vector_store;
