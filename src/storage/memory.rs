//! In-memory artifact store for unit tests

use crate::storage::{ArtifactStore, ExtractionRecord, SkippedRecord, StorageError, StorageResult};
use std::path::PathBuf;

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    /// One entry per successful `write_records` call
    pub(crate) flushes: Vec<Vec<ExtractionRecord>>,
    pub(crate) skipped: Vec<SkippedRecord>,

    /// Number of upcoming `write_records` calls that fail
    pub(crate) failing_flushes: usize,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// All persisted records in flush order
    pub(crate) fn records(&self) -> Vec<&ExtractionRecord> {
        self.flushes.iter().flatten().collect()
    }
}

impl ArtifactStore for MemoryStore {
    fn write_records(&mut self, records: &[ExtractionRecord]) -> StorageResult<PathBuf> {
        if self.failing_flushes > 0 {
            self.failing_flushes -= 1;
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }

        self.flushes.push(records.to_vec());
        Ok(PathBuf::from(format!("memory/flush_{}", self.flushes.len())))
    }

    fn write_skipped(&mut self, skipped: &SkippedRecord) -> StorageResult<PathBuf> {
        self.skipped.push(skipped.clone());
        Ok(PathBuf::from(format!("memory/skipped_{}", self.skipped.len())))
    }
}
