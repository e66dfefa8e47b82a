//! Batching and bounded-concurrency execution.
//!
//! [`process_in_batches`] reads validated records from one CSV file, groups
//! them into [`Batch`]es of `batch_size`, and hands each batch to an async
//! handler.
//!
//! # Concurrency
//!
//! - `max_concurrency == 1`: the handler is awaited inline. No further rows
//!   are read until it resolves, so at most one batch is held in memory.
//! - `max_concurrency > 1`: a semaphore with `max_concurrency` permits gates
//!   dispatch. The producer acquires a permit before spawning a handler and
//!   blocks while none are free; the permit is released when the handler
//!   finishes. At most `max_concurrency` handlers are ever unresolved.
//!
//! # Failure
//!
//! The first handler error, or panic, is logged with its batch index and
//! returned.
//! Batches that already completed are not rolled back; handlers still in
//! flight are aborted when the call returns.

use anyhow::{anyhow, Context, Result};
use lead_ingest_core::{HeaderMapping, PersonRecord};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};

use crate::csv_stream::{ParseStats, PersonCsvReader};

/// Rows between progress callbacks.
pub const PROGRESS_INTERVAL: u64 = 1_000;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub max_concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_concurrency: 1,
        }
    }
}

/// A group of records handed to one handler invocation.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Zero-based, assigned in production order per file.
    pub index: usize,
    pub records: Vec<PersonRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Progress callback, invoked with the cumulative row count each time it
/// crosses a multiple of [`PROGRESS_INTERVAL`].
pub type ProgressCallback<'a> = &'a (dyn Fn(u64) + Send + Sync);

/// Stream `path` through `handler` in batches and return the row counters.
///
/// Every batch has exactly `batch_size` records except possibly the last.
/// The call resolves only after every dispatched handler has finished.
pub async fn process_in_batches<H, Fut>(
    path: &Path,
    mapping: &HeaderMapping,
    options: BatchOptions,
    handler: H,
    on_progress: Option<ProgressCallback<'_>>,
) -> Result<ParseStats>
where
    H: FnMut(Batch) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let batch_size = options.batch_size.max(1);
    let mut reader = PersonCsvReader::open(path, mapping).await?;
    let mut dispatcher = Dispatcher::new(handler, options.max_concurrency);
    let mut buffer = Vec::with_capacity(batch_size);
    let mut next_mark = PROGRESS_INTERVAL;

    let mut report = |rows: u64| {
        if let Some(callback) = on_progress {
            while rows >= next_mark {
                callback(next_mark);
                next_mark += PROGRESS_INTERVAL;
            }
        }
    };

    while let Some(record) = reader.next_record().await? {
        buffer.push(record);
        report(reader.stats().total_rows);

        if buffer.len() >= batch_size {
            let records = std::mem::replace(&mut buffer, Vec::with_capacity(batch_size));
            dispatcher.dispatch(records).await?;
        }
    }
    report(reader.stats().total_rows);

    if !buffer.is_empty() {
        dispatcher.dispatch(buffer).await?;
    }
    let batches = dispatcher.drain().await?;

    let stats = reader.stats();
    tracing::debug!(
        path = %path.display(),
        batches,
        total_rows = stats.total_rows,
        valid_rows = stats.valid_rows,
        invalid_rows = stats.invalid_rows,
        "file streamed"
    );
    Ok(stats)
}

/// Hands batches to the handler, inline or on spawned tasks.
struct Dispatcher<H> {
    handler: H,
    sequential: bool,
    slots: Arc<Semaphore>,
    in_flight: JoinSet<Result<()>>,
    /// Batch index of every spawned task, so a panicked task can still be
    /// reported by index.
    task_batches: HashMap<Id, usize>,
    next_index: usize,
}

impl<H, Fut> Dispatcher<H>
where
    H: FnMut(Batch) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn new(handler: H, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            handler,
            sequential: max_concurrency == 1,
            slots: Arc::new(Semaphore::new(max_concurrency)),
            in_flight: JoinSet::new(),
            task_batches: HashMap::new(),
            next_index: 0,
        }
    }

    async fn dispatch(&mut self, records: Vec<PersonRecord>) -> Result<()> {
        let index = self.next_index;
        self.next_index += 1;
        let batch = Batch { index, records };
        tracing::trace!(batch = index, size = batch.len(), "dispatching batch");

        if self.sequential {
            let result = (self.handler)(batch).await;
            return check_batch(index, result);
        }

        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .context("batch slots closed")?;
        self.reap_finished()?;

        let work = (self.handler)(batch);
        let task = self.in_flight.spawn(async move {
            let result = work.await;
            drop(permit);
            result
        });
        self.task_batches.insert(task.id(), index);
        Ok(())
    }

    /// Collect handlers that already finished, surfacing the first failure.
    fn reap_finished(&mut self) -> Result<()> {
        while let Some(joined) = self.in_flight.try_join_next_with_id() {
            self.settle(joined)?;
        }
        Ok(())
    }

    /// Wait for every outstanding handler. Returns the number of batches
    /// dispatched.
    async fn drain(mut self) -> Result<usize> {
        while let Some(joined) = self.in_flight.join_next_with_id().await {
            self.settle(joined)?;
        }
        Ok(self.next_index)
    }

    fn settle(&mut self, joined: Result<(Id, Result<()>), JoinError>) -> Result<()> {
        let (id, result) = match joined {
            Ok((id, result)) => (id, result),
            Err(e) => (e.id(), Err(anyhow!("batch task failed: {}", e))),
        };
        match self.task_batches.remove(&id) {
            Some(index) => check_batch(index, result),
            None => result,
        }
    }
}

fn check_batch(index: usize, result: Result<()>) -> Result<()> {
    result.map_err(|e| {
        tracing::error!(batch = index, error = %format!("{:#}", e), "batch handler failed");
        e.context(format!("batch {} failed", index))
    })
}
