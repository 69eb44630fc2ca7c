use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for Media-Harvest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// Target site identification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Substring the page title must contain for the page to be a media page
    #[serde(rename = "title-marker")]
    pub title_marker: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title_marker: "Showcase Media".to_string(),
        }
    }
}

/// HTTP page fetcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// User agent sent with every page request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whole-request timeout for a single navigation (milliseconds)
    #[serde(rename = "page-load-timeout-ms")]
    pub page_load_timeout_ms: u64,

    /// Connect timeout (milliseconds)
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("media-harvest/{}", env!("CARGO_PKG_VERSION")),
            page_load_timeout_ms: 5_000,
            connect_timeout_ms: 5_000,
        }
    }
}

impl FetcherConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Per-record retry and deadline policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per URL
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Soft wall-clock deadline per URL, checked between attempts (milliseconds)
    #[serde(rename = "record-deadline-ms")]
    pub record_deadline_ms: u64,

    /// Pause between attempts (milliseconds)
    #[serde(rename = "backoff-ms")]
    pub backoff_ms: u64,

    /// Whether wrong-page-kind and invalid-URL failures are retried like transient ones
    #[serde(rename = "retry-categorical")]
    pub retry_categorical: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            record_deadline_ms: 10_000,
            backoff_ms: 1_000,
            retry_categorical: true,
        }
    }
}

impl RetryConfig {
    pub fn record_deadline(&self) -> Duration {
        Duration::from_millis(self.record_deadline_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Layout detection and field extraction timeouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    #[serde(rename = "title-timeout-ms")]
    pub title_timeout_ms: u64,

    /// Wait for any known label element before trying variants
    #[serde(rename = "content-timeout-ms")]
    pub content_timeout_ms: u64,

    /// Wait per layout variant for its media-type element
    #[serde(rename = "layout-timeout-ms")]
    pub layout_timeout_ms: u64,

    /// Wait for a single field's label before recording it as missing
    #[serde(rename = "field-timeout-ms")]
    pub field_timeout_ms: u64,

    /// Deadline shared by the whole field loop of one page
    #[serde(rename = "extraction-timeout-ms")]
    pub extraction_timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            title_timeout_ms: 3_000,
            content_timeout_ms: 5_000,
            layout_timeout_ms: 10_000,
            field_timeout_ms: 2_000,
            extraction_timeout_ms: 30_000,
        }
    }
}

impl DetectionConfig {
    pub fn title_timeout(&self) -> Duration {
        Duration::from_millis(self.title_timeout_ms)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_millis(self.content_timeout_ms)
    }

    pub fn layout_timeout(&self) -> Duration {
        Duration::from_millis(self.layout_timeout_ms)
    }

    pub fn field_timeout(&self) -> Duration {
        Duration::from_millis(self.field_timeout_ms)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }
}

/// Artifact output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// File name prefix of the Parquet record artifacts
    #[serde(rename = "file-prefix")]
    pub file_prefix: String,

    /// File name prefix of the skipped-record JSON files
    #[serde(rename = "skipped-prefix")]
    pub skipped_prefix: String,

    /// Number of buffered records that triggers a flush
    #[serde(rename = "flush-every")]
    pub flush_every: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_prefix: "media_records".to_string(),
            skipped_prefix: "skipped_records".to_string(),
            flush_every: 10,
        }
    }
}

/// Pass/fail thresholds for a run evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    #[serde(rename = "min-records")]
    pub min_records: usize,

    #[serde(rename = "max-avg-time-secs")]
    pub max_avg_time_secs: f64,

    #[serde(rename = "max-error-rate")]
    pub max_error_rate: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            min_records: 8,
            max_avg_time_secs: 30.0,
            max_error_rate: 0.2,
        }
    }
}
