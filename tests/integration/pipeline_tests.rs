//! Integration tests for the extraction pipeline
//!
//! These tests use wiremock to serve catalog pages and drive the full batch cycle
//! end-to-end: HTTP fetching, layout detection, Parquet artifacts and evaluation.

use arrow::array::{Array, StringArray};
use media_harvest::config::{Config, EvaluationConfig, RetryConfig};
use media_harvest::fetcher::HttpPageFetcher;
use media_harvest::output::evaluate_run;
use media_harvest::pipeline::run_extraction;
use media_harvest::storage::read_artifact;
use media_harvest::BatchProgressState;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a catalog page with the given label/value classes
fn catalog_page(label_class: &str, value_class: &str, media_type: &str, id: &str) -> String {
    format!(
        r#"<html><head><title>Showcase Media: Specimen {id}</title></head><body>
        <div class="row"><div class="{label_class}">Media type</div><div class="{value_class}">{media_type}</div></div>
        <div class="row"><div class="{label_class}">Media ID</div><div class="{value_class}">{id}</div></div>
        <div class="row"><div class="{label_class}">File format(s)</div><div class="{value_class}">model/ply</div></div>
        </body></html>"#
    )
}

fn test_config() -> Config {
    Config {
        retry: RetryConfig {
            backoff_ms: 10,
            ..RetryConfig::default()
        },
        evaluation: EvaluationConfig {
            min_records: 5,
            ..EvaluationConfig::default()
        },
        ..Config::default()
    }
}

/// Serves ten media pages, alternating layouts, and one page that is not a media page
async fn start_catalog() -> (MockServer, Vec<String>) {
    let server = MockServer::start().await;
    let mut candidates = Vec::new();

    for i in 0..10 {
        let body = if i % 2 == 0 {
            catalog_page("showcase-label", "showcase-value", "Mesh", &format!("M{i}"))
        } else {
            catalog_page(
                "field-name",
                "field-value",
                "Volumetric Image Series",
                &format!("M{i}"),
            )
        };
        let route = format!("/media/{i}");
        Mock::given(method("GET"))
            .and(path(route.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;
        candidates.push(format!("{}{}", server.uri(), route));
    }

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>About us</title></head><body></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    candidates.insert(3, format!("{}/about", server.uri()));

    (server, candidates)
}

fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(extension))
        .collect();
    files.sort();
    files
}

fn media_ids(path: &Path) -> Vec<Option<String>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap())
        .unwrap()
        .build()
        .unwrap();

    let mut ids = Vec::new();
    for batch in reader {
        let batch = batch.unwrap();
        let column = batch.column_by_name("media_id").unwrap();
        let values = column.as_any().downcast_ref::<StringArray>().unwrap();
        for i in 0..values.len() {
            ids.push(values.is_valid(i).then(|| values.value(i).to_string()));
        }
    }
    ids
}

#[tokio::test]
async fn test_full_run_in_two_batches() {
    let (_server, candidates) = start_catalog().await;
    assert_eq!(candidates.len(), 11);

    let output = tempdir().unwrap();
    let config = test_config();

    // First batch
    let first = run_extraction(
        HttpPageFetcher::new(config.fetcher.clone()),
        &config,
        &candidates,
        BatchProgressState::default(),
        6,
        output.path(),
    )
    .await
    .unwrap();

    assert!(first.has_more);
    assert_eq!(first.next_index, 6);
    assert_eq!(first.total_processed, 6);
    assert_eq!(first.processed, 6);
    // The about page fails both attempts
    assert_eq!(first.error_count, 2);
    assert_eq!(first.skipped_count, 1);

    // Second batch resumes where the first stopped
    let second = run_extraction(
        HttpPageFetcher::new(config.fetcher.clone()),
        &config,
        &candidates,
        first.next_state(0),
        6,
        output.path(),
    )
    .await
    .unwrap();

    assert!(!second.has_more);
    assert_eq!(second.next_index, 11);
    assert_eq!(second.total_processed, 11);
    assert_eq!(second.error_count, 0);

    // Every candidate persisted exactly once across the artifacts
    let artifacts = files_with_extension(output.path(), "parquet");
    assert_eq!(artifacts.len(), 2);

    let mut indices: Vec<i64> = artifacts
        .iter()
        .flat_map(|path| read_artifact(path).unwrap().rows)
        .map(|row| row.batch_index.unwrap())
        .collect();
    indices.sort();
    assert_eq!(indices, (0..11).collect::<Vec<_>>());

    let errored: Vec<i64> = artifacts
        .iter()
        .flat_map(|path| read_artifact(path).unwrap().rows)
        .filter(|row| row.error.is_some())
        .map(|row| row.batch_index.unwrap())
        .collect();
    assert_eq!(errored, vec![3]);

    // Both layouts yield the media id; the errored record has none
    let first_ids = media_ids(&artifacts[0]);
    assert_eq!(first_ids[0].as_deref(), Some("M0"));
    assert_eq!(first_ids[1].as_deref(), Some("M1"));
    assert_eq!(first_ids[3], None);

    // The skipped record went to its own JSON file
    let skipped = files_with_extension(output.path(), "json");
    assert_eq!(skipped.len(), 1);
    let content: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&skipped[0]).unwrap()).unwrap();
    assert_eq!(content[0]["index"], 3);
    assert_eq!(content[0]["reason"], "max_attempts");
    assert_eq!(content[0]["attempts"], 2);

    // Evaluation over the whole run
    let report = evaluate_run(output.path(), &config.evaluation).unwrap();
    assert_eq!(report.records, 11);
    assert_eq!(report.errors, 1);
    assert_eq!(report.valid_files, 2);
    assert!(report.invalid_files.is_empty());
    assert!(report.success, "{:?}", report.failure_reason);
}

#[tokio::test]
async fn test_completed_run_writes_nothing() {
    let (server, candidates) = start_catalog().await;
    let output = tempdir().unwrap();
    let config = test_config();

    let report = run_extraction(
        HttpPageFetcher::new(config.fetcher.clone()),
        &config,
        &candidates,
        BatchProgressState::new(11, 11, 0),
        500,
        output.path(),
    )
    .await
    .unwrap();

    assert!(report.already_complete);
    assert!(!report.has_more);
    assert_eq!(report.next_index, 11);
    assert_eq!(report.total_processed, 11);

    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(files_with_extension(output.path(), "parquet").is_empty());
}

#[tokio::test]
async fn test_target_stops_run_early() {
    let (_server, candidates) = start_catalog().await;
    let output = tempdir().unwrap();
    let config = test_config();

    let report = run_extraction(
        HttpPageFetcher::new(config.fetcher.clone()),
        &config,
        &candidates,
        BatchProgressState::new(0, 0, 3),
        500,
        output.path(),
    )
    .await
    .unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.next_index, 3);
    assert_eq!(report.total_processed, 3);

    let report = evaluate_run(output.path(), &config.evaluation).unwrap();
    assert_eq!(report.records, 3);
    assert!(!report.success);
}

#[tokio::test]
async fn test_unreachable_pages_are_recorded_as_errors() {
    let output = tempdir().unwrap();
    let config = test_config();
    // Nothing listens on port 9 of localhost
    let candidates = vec!["http://127.0.0.1:9/media/1".to_string()];

    let report = run_extraction(
        HttpPageFetcher::new(config.fetcher.clone()),
        &config,
        &candidates,
        BatchProgressState::default(),
        500,
        output.path(),
    )
    .await
    .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.error_count, 2);
    assert_eq!(report.skipped_count, 1);

    let artifacts = files_with_extension(output.path(), "parquet");
    let rows = read_artifact(&artifacts[0]).unwrap().rows;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].error.is_some());
    assert_eq!(rows[0].attempt, 2);
}
