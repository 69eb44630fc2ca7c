//! Storage module for persisting extraction artifacts
//!
//! This module handles all artifact I/O for the pipeline, including:
//! - The record types that flow from the processor to disk
//! - Columnar (Parquet) artifact files, one per flush
//! - Skipped-record side-channel files, one per skipped URL
//! - Reading artifacts back for evaluation

#[cfg(test)]
pub(crate) mod memory;
mod parquet_store;
mod schema;
mod traits;

pub use parquet_store::{read_artifact, ArtifactRow, ArtifactRows, ParquetArtifactStore};
pub use schema::{
    dynamic_column_name, records_to_batch, FIXED_COLUMNS, PARQUET_EXTENSION, REQUIRED_COLUMNS,
};
pub use traits::{ArtifactStore, StorageError, StorageResult};

use crate::extract::LayoutVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One outcome per candidate URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionRecord {
    pub url: String,
    pub processed_at: DateTime<Utc>,

    /// Reason the outcome is not a clean extraction, if any
    pub error: Option<String>,

    /// Position in the global candidate sequence
    pub batch_index: usize,

    /// 1-based attempt that produced this outcome
    pub attempt: u32,

    /// Wall-clock seconds spent on this URL
    pub processing_time: f64,

    /// Detected layout variant, when detection got that far
    pub layout: Option<LayoutVariant>,

    /// True when field extraction stopped at its deadline
    pub truncated: bool,

    /// Normalized field name to value; `None` for fields not found on the page
    pub fields: BTreeMap<String, Option<String>>,
}

impl ExtractionRecord {
    /// Creates an empty, error-free record stamped with the current time
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            processed_at: Utc::now(),
            error: None,
            batch_index: 0,
            attempt: 0,
            processing_time: 0.0,
            layout: None,
            truncated: false,
            fields: BTreeMap::new(),
        }
    }

    /// Creates a record carrying only an error
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(url)
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Why a URL was given up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The record deadline ended the retry loop
    Timeout,
    /// The retry budget ran out first
    MaxAttempts,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::MaxAttempts => "max_attempts",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A URL that never produced an error-free outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub url: String,

    /// Same value as the record's `batch_index`
    pub index: usize,

    pub reason: SkipReason,
    pub processing_time: f64,
    pub attempts: u32,
}
