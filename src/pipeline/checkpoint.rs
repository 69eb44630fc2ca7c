//! Batch sequencing across invocations
//!
//! Pure arithmetic over the candidate count and the carried progress state. Nothing
//! here touches the fetcher or the disk.

use crate::output::RunOutput;
use crate::state::BatchProgressState;

/// The contiguous slice one invocation processes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSlice {
    pub start_index: usize,
    pub end_index: usize,

    /// Candidate sequence length
    pub candidate_count: usize,

    /// Effective run target
    pub target: usize,
}

impl BatchSlice {
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What one invocation should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPlan {
    /// The run target is already met; nothing is processed
    Complete { total_processed: usize, target: usize },

    /// Process this slice
    Slice(BatchSlice),
}

/// Plans the slice for this invocation
///
/// The slice starts at `start_index` and holds at most `max_records` candidates, never
/// more than the run target still needs, and never reaches past the end of the
/// candidate sequence.
///
/// # Arguments
///
/// * `candidate_count` - Length of the full candidate sequence
/// * `progress` - State carried from the previous invocation
/// * `max_records` - Per-invocation cap
pub fn plan_batch(
    candidate_count: usize,
    progress: &BatchProgressState,
    max_records: usize,
) -> BatchPlan {
    let target = progress.effective_target(candidate_count);
    if progress.total_processed >= target {
        return BatchPlan::Complete {
            total_processed: progress.total_processed,
            target,
        };
    }

    let remaining = target - progress.total_processed;
    let start_index = progress.start_index.min(candidate_count);
    let end_index = start_index
        .saturating_add(max_records.min(remaining))
        .min(candidate_count);

    BatchPlan::Slice(BatchSlice {
        start_index,
        end_index,
        candidate_count,
        target,
    })
}

/// What an invocation reports to its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub has_more: bool,
    pub next_index: usize,
    pub total_processed: usize,

    /// Failed attempts across the batch
    pub error_count: usize,

    pub skipped_count: usize,

    /// Records processed by this invocation
    pub processed: usize,

    /// True when the invocation found the target already met
    pub already_complete: bool,
}

impl BatchReport {
    /// Report for an invocation that found nothing left to do
    pub fn already_complete(progress: &BatchProgressState) -> Self {
        Self {
            has_more: false,
            next_index: progress.start_index,
            total_processed: progress.total_processed,
            error_count: 0,
            skipped_count: 0,
            processed: 0,
            already_complete: true,
        }
    }

    /// Report after processing a slice
    pub fn after_slice(
        slice: &BatchSlice,
        progress: &BatchProgressState,
        processed: usize,
        error_count: usize,
        skipped_count: usize,
    ) -> Self {
        Self {
            has_more: slice.end_index < slice.candidate_count,
            next_index: slice.end_index,
            total_processed: progress.total_processed + processed,
            error_count,
            skipped_count,
            processed,
            already_complete: false,
        }
    }

    /// The state the next invocation should start from
    pub fn next_state(&self, total_target: usize) -> BatchProgressState {
        BatchProgressState::new(self.next_index, self.total_processed, total_target)
    }

    /// Queues the report on the run-output channel
    pub fn write_to(&self, output: &mut RunOutput) {
        output
            .set("has_more", self.has_more)
            .set("next_index", self.next_index)
            .set("total_processed", self.total_processed);

        if !self.already_complete {
            output
                .set("error_count", self.error_count)
                .set("skipped_count", self.skipped_count);
        }
    }
}
