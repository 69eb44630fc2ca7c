//! Run evaluation over the artifacts of one or more batches
//!
//! This module discovers every columnar artifact under a directory, validates each
//! against the required columns, merges the valid ones and decides whether the run
//! passed.

use crate::config::EvaluationConfig;
use crate::output::RunOutput;
use crate::storage::{read_artifact, ArtifactRow, PARQUET_EXTENSION};
use crate::HarvestError;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// An artifact excluded from aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidArtifact {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of evaluating a run
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// Records after deduplication by batch index
    pub records: usize,

    /// Rows read across all valid artifacts, before deduplication
    pub rows_read: usize,

    /// Mean processing time in seconds; 0 when there is no data
    pub avg_time: f64,

    /// Records with a non-null error
    pub errors: usize,

    /// `errors / records`; `None` when there are no records
    pub error_rate: Option<f64>,

    pub valid_files: usize,
    pub invalid_files: Vec<InvalidArtifact>,
    pub success: bool,

    /// Why the run failed, if it did
    pub failure_reason: Option<String>,
}

/// Evaluates every artifact under a directory
///
/// # Arguments
///
/// * `artifacts_dir` - Directory searched recursively for `.parquet` files
/// * `thresholds` - Success thresholds
///
/// # Returns
///
/// * `Ok(EvaluationReport)` - The verdict, including "no data" failures
/// * `Err(HarvestError)` - The directory exists but cannot be listed
pub fn evaluate_run(
    artifacts_dir: &Path,
    thresholds: &EvaluationConfig,
) -> Result<EvaluationReport, HarvestError> {
    let files = if artifacts_dir.is_dir() {
        discover_artifacts(artifacts_dir)?
    } else {
        tracing::warn!(
            "Artifacts directory {} does not exist",
            artifacts_dir.display()
        );
        Vec::new()
    };
    tracing::info!("Found {} artifact files", files.len());

    let mut rows = Vec::new();
    let mut valid_files = 0;
    let mut invalid_files = Vec::new();

    for path in files {
        match read_artifact(&path) {
            Ok(artifact) => {
                tracing::debug!("{}: {} rows", path.display(), artifact.rows.len());
                valid_files += 1;
                rows.extend(artifact.rows);
            }
            Err(e) => {
                tracing::warn!("Excluding invalid artifact {}: {}", path.display(), e);
                invalid_files.push(InvalidArtifact {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    let mut report = summarize(rows, thresholds);
    report.valid_files = valid_files;
    report.invalid_files = invalid_files;
    Ok(report)
}

/// Recursively lists `.parquet` files in sorted path order
pub fn discover_artifacts(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some(PARQUET_EXTENSION) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Computes the verdict for a merged set of rows
///
/// Rows sharing a batch index are collapsed to the one with the highest attempt; on a
/// tie the row read last wins.
pub fn summarize(rows: Vec<ArtifactRow>, thresholds: &EvaluationConfig) -> EvaluationReport {
    let rows_read = rows.len();
    let records = deduplicate(rows);

    let mut report = EvaluationReport {
        records: records.len(),
        rows_read,
        avg_time: 0.0,
        errors: records.iter().filter(|r| r.error.is_some()).count(),
        error_rate: None,
        valid_files: 0,
        invalid_files: Vec::new(),
        success: false,
        failure_reason: None,
    };

    if records.is_empty() {
        report.failure_reason = Some("No data: no valid records found".to_string());
        return report;
    }

    let times: Vec<f64> = records.iter().filter_map(|r| r.processing_time).collect();
    if !times.is_empty() {
        report.avg_time = times.iter().sum::<f64>() / times.len() as f64;
    }
    let error_rate = report.errors as f64 / report.records as f64;
    report.error_rate = Some(error_rate);

    let mut failures = Vec::new();
    if report.records < thresholds.min_records {
        failures.push(format!(
            "{} records processed, need at least {}",
            report.records, thresholds.min_records
        ));
    }
    if times.is_empty() {
        failures.push("no processing times recorded".to_string());
    } else if report.avg_time >= thresholds.max_avg_time_secs {
        failures.push(format!(
            "average processing time {:.2}s is not below {:.2}s",
            report.avg_time, thresholds.max_avg_time_secs
        ));
    }
    if error_rate >= thresholds.max_error_rate {
        failures.push(format!(
            "error rate {:.1}% is not below {:.1}%",
            error_rate * 100.0,
            thresholds.max_error_rate * 100.0
        ));
    }

    report.success = failures.is_empty();
    if !report.success {
        report.failure_reason = Some(failures.join("; "));
    }
    report
}

fn deduplicate(rows: Vec<ArtifactRow>) -> Vec<ArtifactRow> {
    let mut by_index: HashMap<i64, ArtifactRow> = HashMap::new();
    let mut unindexed = Vec::new();

    for row in rows {
        let Some(index) = row.batch_index else {
            unindexed.push(row);
            continue;
        };

        match by_index.get(&index) {
            Some(existing) if existing.attempt > row.attempt => {}
            _ => {
                by_index.insert(index, row);
            }
        }
    }

    let mut records: Vec<ArtifactRow> = by_index.into_values().collect();
    records.sort_by_key(|r| r.batch_index);
    records.extend(unindexed);
    records
}

impl EvaluationReport {
    /// Queues the verdict on the run-output channel
    pub fn write_to(&self, output: &mut RunOutput) {
        output
            .set("success", self.success)
            .set("avg_time", self.avg_time);
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Run Evaluation ===")?;
        writeln!(f)?;
        writeln!(f, "Records processed: {}", self.records)?;
        if self.rows_read != self.records {
            writeln!(f, "Rows read (before deduplication): {}", self.rows_read)?;
        }
        writeln!(f, "Average processing time: {:.2}s", self.avg_time)?;
        writeln!(f, "Records with errors: {}", self.errors)?;
        if let Some(rate) = self.error_rate {
            writeln!(f, "Error rate: {:.1}%", rate * 100.0)?;
        }
        writeln!(f, "Valid artifact files: {}", self.valid_files)?;

        if !self.invalid_files.is_empty() {
            writeln!(f, "Invalid artifact files ({}):", self.invalid_files.len())?;
            for invalid in &self.invalid_files {
                writeln!(f, "  - {}: {}", invalid.path.display(), invalid.reason)?;
            }
        }

        if let Some(reason) = &self.failure_reason {
            writeln!(f, "Reason: {}", reason)?;
        }
        write!(
            f,
            "Evaluation: {}",
            if self.success { "SUCCESS" } else { "FAILED" }
        )
    }
}
