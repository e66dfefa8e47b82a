//! Upload orchestration: CSV files → embeddings → vector collection.
//!
//! # Pipeline
//!
//! ```text
//! scan → skip checkpointed → per file: stream → batch → (ids, embed, upsert)
//!                                                 ↓
//!                                      checkpoint file on success
//! ```
//!
//! Each batch gets content-derived ids ([`person_id`]), one embedding request
//! carrying the JSON form of every record, and one soft upsert. Because ids
//! are content-derived, re-uploading a file or seeing the same person in two
//! files overwrites rather than duplicates.
//!
//! The collection is created with HNSW graph construction off and switched
//! to [`IndexPhase::QueryReady`] once every file has been uploaded. A file
//! failure aborts the run before that switch and leaves the file
//! uncheckpointed, so the next run retries it.

use anyhow::{bail, Context, Result};
use lead_ingest_core::{person_id, HeaderMapping};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::batch::{process_in_batches, Batch, BatchOptions};
use crate::checkpoint::CheckpointStore;
use crate::config::{Config, InputConfig};
use crate::csv_stream::ParseStats;
use crate::embedding::{create_embedder, Embedder};
use crate::progress::{
    format_number, IngestProgressEvent, NoProgress, ProgressMode, ProgressReporter,
};
use crate::scanner::scan_csv_files;
use crate::vector_store::{create_store, IndexPhase, Point, VectorStore};

/// Outcome of uploading one file.
#[derive(Debug, Clone, Default)]
pub struct FileReport {
    pub path: PathBuf,
    pub stats: ParseStats,
    pub batches: u64,
    pub points: u64,
    /// Summed over batches; overlaps when batches run concurrently.
    pub embed_time: Duration,
    pub upsert_time: Duration,
    pub elapsed: Duration,
}

/// Outcome of a whole upload run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub collection_created: bool,
    pub files_found: usize,
    pub files_skipped: usize,
    pub files_uploaded: usize,
    pub stats: ParseStats,
    pub points: u64,
    pub embed_time: Duration,
    pub upsert_time: Duration,
    pub elapsed: Duration,
}

impl RunSummary {
    fn absorb(&mut self, report: &FileReport) {
        self.files_uploaded += 1;
        self.stats += report.stats;
        self.points += report.points;
        self.embed_time += report.embed_time;
        self.upsert_time += report.upsert_time;
    }
}

#[derive(Debug, Default)]
struct BatchTotals {
    batches: u64,
    points: u64,
    embed_time: Duration,
    upsert_time: Duration,
}

pub struct Uploader {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    checkpoint: CheckpointStore,
    mapping: HeaderMapping,
    options: BatchOptions,
    progress: Arc<dyn ProgressReporter>,
}

impl Uploader {
    /// An uploader with the standard header mapping, default batching and no
    /// progress output.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        checkpoint: CheckpointStore,
    ) -> Self {
        Self {
            embedder,
            store,
            checkpoint,
            mapping: HeaderMapping::standard(),
            options: BatchOptions::default(),
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_mapping(mut self, mapping: HeaderMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn checkpoint(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    /// Stream one file into the collection. Does not touch the checkpoint.
    pub async fn embed_and_upload_file(&self, path: &Path) -> Result<FileReport> {
        let started = Instant::now();
        let totals = Arc::new(Mutex::new(BatchTotals::default()));

        let handler = |batch: Batch| {
            let embedder = Arc::clone(&self.embedder);
            let store = Arc::clone(&self.store);
            let totals = Arc::clone(&totals);
            async move { upload_batch(embedder.as_ref(), store.as_ref(), batch, &totals).await }
        };
        let on_progress = |rows: u64| {
            self.progress.report(IngestProgressEvent::Rows {
                path: path.to_path_buf(),
                rows,
            })
        };

        let stats =
            process_in_batches(path, &self.mapping, self.options, handler, Some(&on_progress))
                .await?;

        let totals = totals.lock().unwrap_or_else(PoisonError::into_inner);
        let report = FileReport {
            path: path.to_path_buf(),
            stats,
            batches: totals.batches,
            points: totals.points,
            embed_time: totals.embed_time,
            upsert_time: totals.upsert_time,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            path = %path.display(),
            rows = stats.total_rows,
            invalid = stats.invalid_rows,
            points = report.points,
            batches = report.batches,
            embed_ms = report.embed_time.as_millis() as u64,
            upsert_ms = report.upsert_time.as_millis() as u64,
            "file uploaded"
        );
        Ok(report)
    }

    /// Upload every CSV file under `input` that is not yet checkpointed.
    pub async fn run(&self, input: &InputConfig) -> Result<RunSummary> {
        let started = Instant::now();
        let collection_created = self
            .store
            .ensure_collection(self.embedder.dims())
            .await
            .context("failed to prepare vector collection")?;

        self.progress.report(IngestProgressEvent::Discovering {
            root: input.root.clone(),
        });
        let files = scan_csv_files(input)?;
        tracing::info!(root = %input.root.display(), files = files.len(), "scan complete");

        let mut summary = RunSummary {
            collection_created,
            files_found: files.len(),
            ..RunSummary::default()
        };

        for (i, path) in files.iter().enumerate() {
            if self.checkpoint.is_file_checkpointed(path).await? {
                tracing::info!(path = %path.display(), "already uploaded, skipping");
                self.progress
                    .report(IngestProgressEvent::FileSkipped { path: path.clone() });
                summary.files_skipped += 1;
                continue;
            }

            self.progress.report(IngestProgressEvent::FileStarted {
                path: path.clone(),
                n: i + 1,
                total: files.len(),
            });
            let report = self
                .embed_and_upload_file(path)
                .await
                .with_context(|| format!("upload of {} failed", path.display()))?;
            self.checkpoint.checkpoint_file(path).await?;
            self.progress.report(IngestProgressEvent::FileCompleted {
                path: path.clone(),
                rows: report.stats.total_rows,
                points: report.points,
                elapsed_ms: report.elapsed.as_millis() as u64,
            });
            summary.absorb(&report);
        }

        self.store
            .set_index_phase(IndexPhase::QueryReady)
            .await
            .context("failed to enable the search index")?;
        summary.elapsed = started.elapsed();
        Ok(summary)
    }
}

async fn upload_batch(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    batch: Batch,
    totals: &Mutex<BatchTotals>,
) -> Result<()> {
    let Batch { index, records } = batch;
    let texts = records
        .iter()
        .map(|r| r.to_json())
        .collect::<serde_json::Result<Vec<_>>>()?;

    let embed_started = Instant::now();
    let vectors = embedder
        .embed_passages(&texts)
        .await
        .with_context(|| format!("embedding batch {} failed", index))?;
    let embed_time = embed_started.elapsed();
    if vectors.len() != records.len() {
        bail!(
            "embedder returned {} vectors for {} records",
            vectors.len(),
            records.len()
        );
    }

    let points: Vec<Point> = records
        .into_iter()
        .zip(vectors)
        .map(|(payload, vector)| Point {
            id: person_id(&payload),
            vector,
            payload,
        })
        .collect();
    let count = points.len() as u64;

    let upsert_started = Instant::now();
    store
        .upsert(points)
        .await
        .with_context(|| format!("upserting batch {} failed", index))?;
    let upsert_time = upsert_started.elapsed();

    let mut totals = totals.lock().unwrap_or_else(PoisonError::into_inner);
    totals.batches += 1;
    totals.points += count;
    totals.embed_time += embed_time;
    totals.upsert_time += upsert_time;
    tracing::debug!(
        batch = index,
        points = count,
        embed_ms = embed_time.as_millis() as u64,
        upsert_ms = upsert_time.as_millis() as u64,
        "batch uploaded"
    );
    Ok(())
}

/// Build an [`Uploader`] from configuration.
pub fn build_uploader(config: &Config, progress: ProgressMode) -> Result<Uploader> {
    let embedder = create_embedder(&config.embedding)?;
    let store = create_store(&config.vector_store)?;
    Ok(Uploader::new(
        embedder,
        store,
        CheckpointStore::new(&config.checkpoint.path),
    )
    .with_options(BatchOptions {
        batch_size: config.batching.batch_size,
        max_concurrency: config.batching.max_concurrency,
    })
    .with_progress(progress.reporter()))
}

/// Run the upload driver and print a summary.
pub async fn run_upload(config: &Config, progress: ProgressMode) -> Result<()> {
    let uploader = build_uploader(config, progress)?;
    let summary = uploader.run(&config.input).await?;

    println!("upload {}", config.input.root.display());
    println!("  collection: {}", config.vector_store.collection);
    if summary.collection_created {
        println!("  collection created: yes");
    }
    println!("  files found: {}", summary.files_found);
    println!("  files skipped (checkpointed): {}", summary.files_skipped);
    println!("  files uploaded: {}", summary.files_uploaded);
    println!("  rows read: {}", format_number(summary.stats.total_rows));
    println!("  rows invalid: {}", format_number(summary.stats.invalid_rows));
    println!("  points upserted: {}", format_number(summary.points));
    println!(
        "  time: {:.1}s (embed {:.1}s, upsert {:.1}s)",
        summary.elapsed.as_secs_f64(),
        summary.embed_time.as_secs_f64(),
        summary.upsert_time.as_secs_f64()
    );
    println!("ok");
    Ok(())
}
