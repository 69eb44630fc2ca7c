//! Storage traits and error types
//!
//! This module defines the trait interface for artifact stores and
//! associated error types.

use crate::storage::{ExtractionRecord, SkippedRecord};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path} is missing required columns: {}", columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("{path}: column '{column}' is not {expected}")]
    ColumnType {
        path: PathBuf,
        column: String,
        expected: &'static str,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for artifact store implementations
///
/// Every call produces a new immutable artifact; nothing is ever appended to or
/// overwritten. A failed call must leave no artifact under a final name.
pub trait ArtifactStore {
    /// Writes a group of records as one columnar artifact
    ///
    /// # Returns
    ///
    /// Where the artifact was written
    fn write_records(&mut self, records: &[ExtractionRecord]) -> StorageResult<PathBuf>;

    /// Writes one skipped record as its own side-channel artifact
    fn write_skipped(&mut self, skipped: &SkippedRecord) -> StorageResult<PathBuf>;
}
