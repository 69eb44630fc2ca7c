//! Cross-invocation batch progress
//!
//! `BatchProgressState` is the only state a batch inherits from the previous one. It is
//! normally carried by the orchestrator through the run-output channel; a checkpoint file
//! can hold it instead.

use crate::HarvestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a run stands between invocations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgressState {
    /// Index into the candidate sequence where the next batch starts
    pub start_index: usize,

    /// Records processed by all previous batches, errored ones included
    pub total_processed: usize,

    /// Records the whole run should process; 0 means the entire candidate sequence
    pub total_target: usize,
}

impl BatchProgressState {
    pub fn new(start_index: usize, total_processed: usize, total_target: usize) -> Self {
        Self {
            start_index,
            total_processed,
            total_target,
        }
    }

    /// Returns the effective target for a candidate sequence of the given length
    pub fn effective_target(&self, candidate_count: usize) -> usize {
        if self.total_target > 0 {
            self.total_target
        } else {
            candidate_count
        }
    }
}

/// On-disk checkpoint written after each batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub state: BatchProgressState,

    /// Hash of the configuration file the batch ran with, if any
    pub config_hash: Option<String>,

    pub updated_at: DateTime<Utc>,
}

/// Loads a checkpoint file
///
/// # Returns
///
/// * `Ok(Some(CheckpointFile))` - The file exists and parsed
/// * `Ok(None)` - No checkpoint has been written yet
/// * `Err(HarvestError)` - The file exists but cannot be read or parsed
pub fn load_checkpoint(path: &Path) -> Result<Option<CheckpointFile>, HarvestError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let checkpoint = serde_json::from_str(&content).map_err(|e| HarvestError::Checkpoint {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(Some(checkpoint))
}

/// Writes a checkpoint file atomically
///
/// The content goes to a `.tmp` sibling first and is renamed into place, so an
/// interrupted write leaves the previous checkpoint intact.
pub fn save_checkpoint(path: &Path, checkpoint: &CheckpointFile) -> Result<(), HarvestError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    let json = serde_json::to_string_pretty(checkpoint)?;
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;

    tracing::debug!("Saved checkpoint to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_effective_target() {
        assert_eq!(BatchProgressState::new(0, 0, 0).effective_target(42), 42);
        assert_eq!(BatchProgressState::new(0, 0, 10).effective_target(42), 10);
    }

    #[test]
    fn test_missing_checkpoint() {
        let dir = tempdir().unwrap();
        let loaded = load_checkpoint(&dir.path().join("state.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_checkpoint_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let checkpoint = CheckpointFile {
            state: BatchProgressState::new(500, 498, 2000),
            config_hash: Some("abc123".to_string()),
            updated_at: Utc::now(),
        };
        save_checkpoint(&path, &checkpoint).unwrap();

        let loaded = load_checkpoint(&path).unwrap().unwrap();
        assert_eq!(loaded, checkpoint);
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_checkpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_checkpoint(&path).unwrap_err();
        assert!(matches!(err, HarvestError::Checkpoint { .. }));
    }
}
