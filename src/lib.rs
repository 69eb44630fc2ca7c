//! Media-Harvest: a resumable metadata harvester for media catalog pages
//!
//! This crate extracts structured metadata from digital-repository media pages in
//! independently invoked batches. Each batch detects the page layout, pulls the fields
//! that match the page's media type, flushes results to Parquet artifacts and reports
//! where the next batch should resume. A separate evaluation pass validates the
//! artifacts of a run and produces a pass/fail verdict.

pub mod config;
pub mod extract;
pub mod fetcher;
pub mod output;
pub mod pipeline;
pub mod state;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Media-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid candidate input {path}: {message}")]
    Input { path: PathBuf, message: String },

    #[error("Invalid checkpoint {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Media-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::LayoutVariant;
pub use state::{BatchProgressState, RecordState};
pub use storage::{ExtractionRecord, SkipReason, SkippedRecord};
