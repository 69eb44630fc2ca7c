//! Parquet artifact store
//!
//! Every flush becomes its own timestamp-named Parquet file and every skipped URL its
//! own JSON file. Files are written under a `.tmp` name and renamed into place, so a
//! crash mid-write never leaves a partial file under a final name.

use crate::config::OutputConfig;
use crate::storage::schema::{records_to_batch, PARQUET_EXTENSION, REQUIRED_COLUMNS};
use crate::storage::{ArtifactStore, ExtractionRecord, SkippedRecord, StorageError, StorageResult};
use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const TMP_SUFFIX: &str = ".tmp";

/// Writes artifacts into one directory
#[derive(Debug, Clone)]
pub struct ParquetArtifactStore {
    dir: PathBuf,
    file_prefix: String,
    skipped_prefix: String,
}

impl ParquetArtifactStore {
    /// Opens a store, creating the directory if needed
    ///
    /// Leftover `.tmp` files from an interrupted write are removed.
    pub fn new(dir: impl Into<PathBuf>, config: &OutputConfig) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let store = Self {
            dir,
            file_prefix: config.file_prefix.clone(),
            skipped_prefix: config.skipped_prefix.clone(),
        };
        store.cleanup_tmp_files()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn cleanup_tmp_files(&self) -> StorageResult<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let ours =
                name.starts_with(&self.file_prefix) || name.starts_with(&self.skipped_prefix);
            if ours && name.ends_with(TMP_SUFFIX) {
                tracing::warn!("Removing incomplete artifact {}", path.display());
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Returns a fresh `<prefix>_<timestamp>[_n].<extension>` path in the store directory
    fn unique_path(&self, prefix: &str, extension: &str) -> PathBuf {
        let base = format!("{}_{}", prefix, Utc::now().format("%Y%m%d_%H%M%S_%3f"));
        let mut path = self.dir.join(format!("{}.{}", base, extension));

        let mut n = 1;
        while path.exists() || tmp_path(&path).exists() {
            path = self.dir.join(format!("{}_{}.{}", base, n, extension));
            n += 1;
        }
        path
    }
}

impl ArtifactStore for ParquetArtifactStore {
    fn write_records(&mut self, records: &[ExtractionRecord]) -> StorageResult<PathBuf> {
        let batch = records_to_batch(records)?;
        let path = self.unique_path(&self.file_prefix, PARQUET_EXTENSION);

        write_atomically(&path, |file| {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(&batch)?;
            writer.close()?;
            Ok(())
        })?;

        tracing::info!("Saved {} records to {}", records.len(), path.display());
        Ok(path)
    }

    fn write_skipped(&mut self, skipped: &SkippedRecord) -> StorageResult<PathBuf> {
        let path = self.unique_path(&self.skipped_prefix, "json");

        write_atomically(&path, |file| {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, std::slice::from_ref(skipped))?;
            writer.flush()?;
            Ok(())
        })?;

        tracing::debug!("Saved skipped record {} to {}", skipped.index, path.display());
        Ok(path)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

fn write_atomically<F>(path: &Path, write: F) -> StorageResult<()>
where
    F: FnOnce(File) -> StorageResult<()>,
{
    let tmp = tmp_path(path);
    let file = OpenOptions::new().write(true).create_new(true).open(&tmp)?;

    if let Err(e) = write(file) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            tracing::warn!("Could not remove {}: {}", tmp.display(), cleanup);
        }
        return Err(e);
    }

    fs::rename(&tmp, path)?;
    Ok(())
}

/// The columns of one artifact row the evaluator needs
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRow {
    pub url: Option<String>,
    pub processing_time: Option<f64>,
    pub error: Option<String>,
    pub batch_index: Option<i64>,

    /// 0 when the artifact has no `attempt` column
    pub attempt: i64,
}

/// All rows of one artifact
#[derive(Debug, Clone)]
pub struct ArtifactRows {
    pub path: PathBuf,
    pub rows: Vec<ArtifactRow>,
}

/// Reads an artifact, checking it carries every required column
///
/// # Returns
///
/// * `Ok(ArtifactRows)` - The file is valid
/// * `Err(StorageError::MissingColumns)` - A required column is absent
/// * `Err(StorageError)` - The file is unreadable or a column has the wrong type
pub fn read_artifact(path: &Path) -> StorageResult<ArtifactRows> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| builder.schema().field_with_name(column).is_err())
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(StorageError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }

    let mut rows = Vec::new();
    for batch in builder.build()? {
        read_batch(path, &batch?, &mut rows)?;
    }

    Ok(ArtifactRows {
        path: path.to_path_buf(),
        rows,
    })
}

fn read_batch(path: &Path, batch: &RecordBatch, rows: &mut Vec<ArtifactRow>) -> StorageResult<()> {
    let url = column::<StringArray>(path, batch, "url", "utf8")?;
    let error = column::<StringArray>(path, batch, "error", "utf8")?;
    let processing_time = column::<Float64Array>(path, batch, "processing_time", "float64")?;
    let batch_index = column::<Int64Array>(path, batch, "batch_index", "int64")?;
    let attempt = match batch.column_by_name("attempt") {
        Some(_) => Some(column::<Int64Array>(path, batch, "attempt", "int64")?),
        None => None,
    };

    for i in 0..batch.num_rows() {
        rows.push(ArtifactRow {
            url: (!url.is_null(i)).then(|| url.value(i).to_string()),
            processing_time: (!processing_time.is_null(i)).then(|| processing_time.value(i)),
            error: (!error.is_null(i)).then(|| error.value(i).to_string()),
            batch_index: (!batch_index.is_null(i)).then(|| batch_index.value(i)),
            attempt: attempt
                .filter(|a| !a.is_null(i))
                .map(|a| a.value(i))
                .unwrap_or(0),
        });
    }

    Ok(())
}

fn column<'a, T: Array + 'static>(
    path: &Path,
    batch: &'a RecordBatch,
    name: &str,
    expected: &'static str,
) -> StorageResult<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|array| array.as_any().downcast_ref::<T>())
        .ok_or_else(|| StorageError::ColumnType {
            path: path.to_path_buf(),
            column: name.to_string(),
            expected,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SkipReason;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn record(index: usize, error: Option<&str>) -> ExtractionRecord {
        let mut record = ExtractionRecord::new(format!("https://catalog.test/media/{}", index));
        record.batch_index = index;
        record.attempt = 2;
        record.processing_time = 0.25 * index as f64;
        record.error = error.map(str::to_string);
        record
            .fields
            .insert("media_id".to_string(), Some(index.to_string()));
        record
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_and_read_records() {
        let dir = tempdir().unwrap();
        let mut store = ParquetArtifactStore::new(dir.path(), &OutputConfig::default()).unwrap();

        let path = store
            .write_records(&[record(0, None), record(1, Some("Content not found quickly enough"))])
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("media_records_"));
        assert!(name.ends_with(".parquet"));

        let artifact = read_artifact(&path).unwrap();
        assert_eq!(artifact.rows.len(), 2);
        assert_eq!(artifact.rows[0].error, None);
        assert_eq!(artifact.rows[0].batch_index, Some(0));
        assert_eq!(artifact.rows[0].attempt, 2);
        assert_eq!(
            artifact.rows[1].error.as_deref(),
            Some("Content not found quickly enough")
        );
        assert_eq!(artifact.rows[1].processing_time, Some(0.25));
        assert_eq!(
            artifact.rows[1].url.as_deref(),
            Some("https://catalog.test/media/1")
        );
    }

    #[test]
    fn test_consecutive_writes_never_overwrite() {
        let dir = tempdir().unwrap();
        let mut store = ParquetArtifactStore::new(dir.path(), &OutputConfig::default()).unwrap();

        let first = store.write_records(&[record(0, None)]).unwrap();
        let second = store.write_records(&[record(1, None)]).unwrap();
        let third = store.write_records(&[record(2, None)]).unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(files_in(dir.path()).len(), 3);
        assert!(files_in(dir.path()).iter().all(|n| !n.ends_with(".tmp")));
    }

    #[test]
    fn test_write_skipped() {
        let dir = tempdir().unwrap();
        let mut store = ParquetArtifactStore::new(dir.path(), &OutputConfig::default()).unwrap();
        let skipped = SkippedRecord {
            url: "https://catalog.test/media/3".to_string(),
            index: 3,
            reason: SkipReason::Timeout,
            processing_time: 11.0,
            attempts: 1,
        };

        let path = store.write_skipped(&skipped).unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("skipped_records_"));

        let content = fs::read_to_string(&path).unwrap();
        let parsed: Vec<SkippedRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, vec![skipped]);
    }

    #[test]
    fn test_stale_tmp_files_removed_on_open() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("media_records_20250101_000000_000.parquet.tmp"), b"x").unwrap();
        fs::write(dir.path().join("unrelated.tmp"), b"x").unwrap();

        ParquetArtifactStore::new(dir.path(), &OutputConfig::default()).unwrap();
        assert_eq!(files_in(dir.path()), vec!["unrelated.tmp".to_string()]);
    }

    #[test]
    fn test_read_artifact_missing_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foreign.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("url", DataType::Utf8, false),
            Field::new("batch_index", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["https://catalog.test/media/1"])),
                Arc::new(Int64Array::from(vec![1])),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        match read_artifact(&path) {
            Err(StorageError::MissingColumns { columns, .. }) => {
                assert_eq!(columns, vec!["processing_time", "error"]);
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_read_artifact_not_parquet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.parquet");
        fs::write(&path, b"definitely not parquet").unwrap();

        assert!(matches!(
            read_artifact(&path),
            Err(StorageError::Parquet(_))
        ));
    }
}
