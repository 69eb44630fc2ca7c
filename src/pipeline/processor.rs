//! Per-URL processing with retries and a record deadline
//!
//! The processor owns the page session for a whole batch. It opens one lazily,
//! reuses it across records and replaces it only after a session failure.

use crate::config::Config;
use crate::extract::{
    detect_layout, extract_fields, fields_for, DetectError, Detection, DetectionSettings,
};
use crate::fetcher::{FetchError, PageFetcher, PageSession};
use crate::state::RecordState;
use crate::storage::{ExtractionRecord, SkipReason, SkippedRecord};
use std::time::Duration;
use tokio::time::Instant;

/// Retry policy and detection settings for one record
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorSettings {
    pub max_attempts: u32,
    pub record_deadline: Duration,
    pub backoff: Duration,
    pub retry_categorical: bool,
    pub detection: DetectionSettings,
}

impl ProcessorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry.max_attempts,
            record_deadline: config.retry.record_deadline(),
            backoff: config.retry.backoff(),
            retry_categorical: config.retry.retry_categorical,
            detection: DetectionSettings::from_config(config),
        }
    }
}

/// Everything processing one URL produced
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// The final record for this URL, errored or not
    pub record: ExtractionRecord,

    /// Set when the URL never produced an error-free record
    pub skipped: Option<SkippedRecord>,

    /// Attempts that ended in an error
    pub failed_attempts: u32,

    /// Terminal state of the record
    pub state: RecordState,
}

/// Runs URLs through detection and extraction
pub struct RecordProcessor<F: PageFetcher> {
    fetcher: F,
    session: Option<F::Session>,
    settings: ProcessorSettings,
}

impl<F: PageFetcher> RecordProcessor<F> {
    pub fn new(fetcher: F, settings: ProcessorSettings) -> Self {
        Self {
            fetcher,
            session: None,
            settings,
        }
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    /// Returns true while a page session is open
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Processes one URL
    ///
    /// Attempts run until one succeeds, the retry budget is spent or the record
    /// deadline passes. Every attempt's waits are capped by what is left of the
    /// deadline, so the recorded processing time never exceeds the deadline by more
    /// than one backoff interval.
    ///
    /// # Arguments
    ///
    /// * `url` - The candidate URL
    /// * `batch_index` - Its position in the global candidate sequence
    ///
    /// # Returns
    ///
    /// Exactly one record, plus a skipped record if no attempt succeeded
    pub async fn process(&mut self, url: &str, batch_index: usize) -> RecordOutcome {
        let started = Instant::now();
        let deadline = self.settings.record_deadline;
        let max_attempts = self.settings.max_attempts;

        let mut state = RecordState::Idle;
        let mut best: Option<ExtractionRecord> = None;
        let mut attempts = 0;
        let mut failed_attempts = 0;

        tracing::info!("Processing record {} (URL: {})", batch_index, url);

        while attempts < max_attempts && started.elapsed() < deadline {
            attempts += 1;
            transition(&mut state, RecordState::Detecting);
            tracing::debug!("Processing URL: {} (attempt {}/{})", url, attempts, max_attempts);

            let remaining = deadline.saturating_sub(started.elapsed());
            let result = match self.detect(url, remaining).await {
                Ok(detection) => {
                    transition(&mut state, RecordState::Extracting);
                    let remaining = deadline.saturating_sub(started.elapsed());
                    self.extract(url, &detection, remaining).await
                }
                Err(e) => Err(e),
            };

            let mut record = match &result {
                Ok(record) => record.clone(),
                Err(e) => ExtractionRecord::failed(url, e.to_string()),
            };
            record.batch_index = batch_index;
            record.attempt = attempts;
            record.processing_time = started.elapsed().as_secs_f64();

            let error = match result {
                Ok(_) => {
                    transition(&mut state, RecordState::Succeeded);
                    tracing::info!("Successfully processed {} (record {})", url, batch_index);
                    return RecordOutcome {
                        record,
                        skipped: None,
                        failed_attempts,
                        state,
                    };
                }
                Err(e) => e,
            };

            failed_attempts += 1;
            best = Some(record);
            transition(&mut state, RecordState::Failed(error.kind()));

            if error.is_session_failure() {
                tracing::error!("Session failure on attempt {} for {}: {}", attempts, url, error);
                self.discard_session().await;
            } else {
                tracing::warn!("Attempt {} for {} failed: {}", attempts, url, error);
            }

            if error.is_categorical() && !self.settings.retry_categorical {
                tracing::info!("Not retrying {}: {}", url, error.kind());
                break;
            }

            if attempts < max_attempts && started.elapsed() < deadline {
                tracing::info!("Retrying {} after error...", url);
                tokio::time::sleep(self.settings.backoff).await;
            }
        }

        let elapsed = started.elapsed();
        let reason = if elapsed >= deadline {
            tracing::warn!("Record processing timeout reached for {}", url);
            SkipReason::Timeout
        } else {
            SkipReason::MaxAttempts
        };

        let record = best.unwrap_or_else(|| {
            let mut record = ExtractionRecord::failed(url, "No attempt was made");
            record.batch_index = batch_index;
            record.processing_time = elapsed.as_secs_f64();
            record
        });

        RecordOutcome {
            record,
            skipped: Some(SkippedRecord {
                url: url.to_string(),
                index: batch_index,
                reason,
                processing_time: elapsed.as_secs_f64(),
                attempts,
            }),
            failed_attempts,
            state,
        }
    }

    /// Navigates and detects the layout, bounded by `remaining`
    async fn detect(&mut self, url: &str, remaining: Duration) -> Result<Detection, DetectError> {
        if self.session.is_none() {
            tracing::info!("Opening new page session");
            self.session = Some(self.fetcher.open().await?);
        }
        let session = self.session.as_mut().ok_or(FetchError::SessionClosed)?;
        let settings = &self.settings.detection;

        let attempt = async move {
            session.navigate(url).await?;
            session.stop_loading().await?;
            detect_layout(session, settings).await
        };

        match tokio::time::timeout(remaining, attempt).await {
            Ok(result) => result,
            Err(_) => Err(DetectError::DeadlineExceeded(self.settings.record_deadline)),
        }
    }

    /// Extracts the fields planned for the detected media type
    ///
    /// The field loop's shared deadline is capped by `remaining`; hitting it truncates
    /// the record instead of failing it.
    async fn extract(
        &mut self,
        url: &str,
        detection: &Detection,
        remaining: Duration,
    ) -> Result<ExtractionRecord, DetectError> {
        let session = self.session.as_mut().ok_or(FetchError::SessionClosed)?;

        let mut settings = self.settings.detection.clone();
        settings.extraction_timeout = settings.extraction_timeout.min(remaining);

        let sections = fields_for(&detection.media_type);
        let extraction = extract_fields(
            session,
            &detection.layout.strategy(),
            &sections,
            &settings,
        )
        .await;

        if extraction.session_lost {
            tracing::warn!("Discarding page session after field reads failed on {}", url);
            self.discard_session().await;
        }

        let mut record = ExtractionRecord::new(url);
        record.layout = Some(detection.layout);
        record.truncated = extraction.truncated;
        record.fields = extraction.values;
        Ok(record)
    }

    async fn discard_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                tracing::debug!("Error closing failed session: {}", e);
            }
        }
    }

    /// Closes the current session, if any
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                tracing::warn!("Error closing page session: {}", e);
            }
        }
    }
}

fn transition(state: &mut RecordState, next: RecordState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid record transition {} -> {}",
        state,
        next
    );
    tracing::trace!("Record state {} -> {}", state, next);
    *state = next;
}
