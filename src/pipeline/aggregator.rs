//! Result buffering and periodic flushing
//!
//! The aggregator owns the in-memory buffer for one invocation. Every `flush_every`
//! records it writes the buffer as a new artifact and drains it; whatever is left is
//! written by the final flush. A failed flush keeps the records buffered so the next
//! flush retries them.

use crate::storage::{ArtifactStore, ExtractionRecord, SkippedRecord, StorageResult};
use std::path::PathBuf;

pub struct ResultAggregator<S: ArtifactStore> {
    store: S,
    buffer: Vec<ExtractionRecord>,
    flush_every: usize,
    persisted: usize,
    skipped: usize,
}

impl<S: ArtifactStore> ResultAggregator<S> {
    pub fn new(store: S, flush_every: usize) -> Self {
        Self {
            store,
            buffer: Vec::new(),
            flush_every: flush_every.max(1),
            persisted: 0,
            skipped: 0,
        }
    }

    /// Adds a record, flushing once the buffer reaches the threshold
    ///
    /// A failed periodic flush is logged and retried on the next threshold or at the
    /// final flush.
    pub fn push(&mut self, record: ExtractionRecord) {
        self.buffer.push(record);

        if self.buffer.len() >= self.flush_every {
            if let Err(e) = self.flush() {
                tracing::error!(
                    "Error saving batch results ({} records kept in memory): {}",
                    self.buffer.len(),
                    e
                );
            }
        }
    }

    /// Persists a skipped record right away
    pub fn record_skipped(&mut self, skipped: &SkippedRecord) {
        self.skipped += 1;
        match self.store.write_skipped(skipped) {
            Ok(path) => tracing::info!("Saved skipped record to {}", path.display()),
            Err(e) => tracing::error!("Error saving skipped record for {}: {}", skipped.url, e),
        }
    }

    /// Writes and drains the buffer
    ///
    /// # Returns
    ///
    /// * `Ok(Some(path))` - The artifact that was written
    /// * `Ok(None)` - The buffer was empty
    /// * `Err(StorageError)` - Nothing was written; the buffer is unchanged
    pub fn flush(&mut self) -> StorageResult<Option<PathBuf>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let path = self.store.write_records(&self.buffer)?;
        self.persisted += self.buffer.len();
        self.buffer.clear();
        Ok(Some(path))
    }

    /// Records waiting for the next flush
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Records written to artifacts so far
    pub fn persisted(&self) -> usize {
        self.persisted
    }

    /// Skipped records seen so far, persisted or not
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the final flush and hands back the store
    pub fn finish(mut self) -> StorageResult<S> {
        self.flush()?;
        Ok(self.store)
    }
}
