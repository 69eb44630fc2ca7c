//! One invocation of the extraction pipeline
//!
//! Plans the slice, runs every URL in it through the processor in order, feeds the
//! outcomes to the aggregator and reports where the next invocation should resume.

use crate::config::Config;
use crate::fetcher::PageFetcher;
use crate::pipeline::aggregator::ResultAggregator;
use crate::pipeline::checkpoint::{plan_batch, BatchPlan, BatchReport};
use crate::pipeline::processor::{ProcessorSettings, RecordProcessor};
use crate::state::BatchProgressState;
use crate::storage::{ArtifactStore, ParquetArtifactStore};
use crate::HarvestError;
use std::path::Path;
use tokio::time::Instant;

/// Runs one batch against an existing processor and aggregator
///
/// The session is closed and the buffer flushed before returning. When the run target
/// is already met nothing is processed and the fetcher is never used.
///
/// # Arguments
///
/// * `candidates` - The full candidate sequence
/// * `progress` - State carried from the previous invocation
/// * `max_records` - Per-invocation cap
/// * `processor` - Record processor owning the page session
/// * `aggregator` - Buffer for this invocation's records
///
/// # Returns
///
/// * `Ok(BatchReport)` - The batch ran and its tail was flushed
/// * `Err(HarvestError)` - The final flush failed
pub async fn run_batch<F, S>(
    candidates: &[String],
    progress: &BatchProgressState,
    max_records: usize,
    processor: &mut RecordProcessor<F>,
    aggregator: &mut ResultAggregator<S>,
) -> Result<BatchReport, HarvestError>
where
    F: PageFetcher,
    S: ArtifactStore,
{
    let slice = match plan_batch(candidates.len(), progress, max_records) {
        BatchPlan::Complete {
            total_processed,
            target,
        } => {
            tracing::info!(
                "Target number of records already processed: {} of {}",
                total_processed,
                target
            );
            return Ok(BatchReport::already_complete(progress));
        }
        BatchPlan::Slice(slice) => slice,
    };

    tracing::info!(
        "Processing batch from index {} to {} (total processed so far: {}, target: {})",
        slice.start_index,
        slice.end_index,
        progress.total_processed,
        slice.target
    );

    let start_time = Instant::now();
    let mut processed = 0;
    let mut error_count = 0;
    let mut skipped_count = 0;

    for (offset, url) in candidates[slice.start_index..slice.end_index]
        .iter()
        .enumerate()
    {
        let outcome = processor.process(url, slice.start_index + offset).await;

        error_count += outcome.failed_attempts as usize;
        if let Some(skipped) = &outcome.skipped {
            tracing::warn!("Skipping {} ({})", skipped.url, skipped.reason);
            aggregator.record_skipped(skipped);
            skipped_count += 1;
        }
        aggregator.push(outcome.record);
        processed += 1;

        if processed % 10 == 0 {
            let elapsed = start_time.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                processed as f64 / elapsed
            } else {
                0.0
            };
            tracing::info!(
                "Progress: {} of {} records processed, {} remaining, {:.2} records/sec",
                processed,
                slice.len(),
                slice.len() - processed,
                rate
            );
        }
    }

    processor.close().await;
    if let Some(path) = aggregator.flush()? {
        tracing::debug!("Final flush written to {}", path.display());
    }

    let report = BatchReport::after_slice(&slice, progress, processed, error_count, skipped_count);
    tracing::info!(
        "Processed {} records in this batch in {:?} ({} failed attempts, {} skipped)",
        processed,
        start_time.elapsed(),
        error_count,
        skipped_count
    );
    Ok(report)
}

/// Runs one batch writing Parquet artifacts into `output_dir`
///
/// # Returns
///
/// * `Ok(BatchReport)` - The batch completed
/// * `Err(HarvestError)` - The output directory could not be prepared or the final
///   flush failed
pub async fn run_extraction<F: PageFetcher>(
    fetcher: F,
    config: &Config,
    candidates: &[String],
    progress: BatchProgressState,
    max_records: usize,
    output_dir: &Path,
) -> Result<BatchReport, HarvestError> {
    let store = ParquetArtifactStore::new(output_dir, &config.output)?;
    let mut aggregator = ResultAggregator::new(store, config.output.flush_every);
    let mut processor = RecordProcessor::new(fetcher, ProcessorSettings::from_config(config));

    run_batch(
        candidates,
        &progress,
        max_records,
        &mut processor,
        &mut aggregator,
    )
    .await
}
