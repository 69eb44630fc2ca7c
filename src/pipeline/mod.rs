//! Pipeline module for batch extraction
//!
//! This module contains the per-invocation machinery:
//! - Loading the candidate sequence
//! - Planning the slice one invocation processes and reporting where to resume
//! - Processing each URL with retries, a record deadline and session recovery
//! - Buffering records and flushing them to artifacts

mod aggregator;
mod batch;
mod candidates;
mod checkpoint;
mod processor;

pub use aggregator::ResultAggregator;
pub use batch::{run_batch, run_extraction};
pub use candidates::{load_candidates, parse_candidates};
pub use checkpoint::{plan_batch, BatchPlan, BatchReport, BatchSlice};
pub use processor::{ProcessorSettings, RecordOutcome, RecordProcessor};
