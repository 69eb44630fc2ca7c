//! State module for tracking extraction progress
//!
//! This module provides state management for records and batches.
//!
//! # Components
//!
//! - `RecordState`: Tracks one URL through detection, extraction and retries
//! - `FailureKind`: Categorizes why an attempt failed
//! - `BatchProgressState`: The checkpoint carried from one invocation to the next

mod progress;
mod record_state;

// Re-export main types
pub use progress::{load_checkpoint, save_checkpoint, BatchProgressState, CheckpointFile};
pub use record_state::{FailureKind, RecordState};
