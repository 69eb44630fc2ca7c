use crate::config::types::{
    Config, DetectionConfig, EvaluationConfig, FetcherConfig, OutputConfig, RetryConfig,
    SiteConfig,
};
use crate::{ConfigError, ConfigResult};

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_site_config(&config.site)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_retry_config(&config.retry)?;
    validate_detection_config(&config.detection)?;
    validate_output_config(&config.output)?;
    validate_evaluation_config(&config.evaluation)?;
    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> ConfigResult<()> {
    if config.title_marker.trim().is_empty() {
        return Err(ConfigError::Validation(
            "title_marker cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    require_positive("page_load_timeout_ms", config.page_load_timeout_ms)?;
    require_positive("connect_timeout_ms", config.connect_timeout_ms)?;
    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> ConfigResult<()> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    require_positive("record_deadline_ms", config.record_deadline_ms)?;
    Ok(())
}

fn validate_detection_config(config: &DetectionConfig) -> ConfigResult<()> {
    require_positive("title_timeout_ms", config.title_timeout_ms)?;
    require_positive("content_timeout_ms", config.content_timeout_ms)?;
    require_positive("layout_timeout_ms", config.layout_timeout_ms)?;
    require_positive("field_timeout_ms", config.field_timeout_ms)?;
    require_positive("extraction_timeout_ms", config.extraction_timeout_ms)?;
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    validate_file_prefix("file_prefix", &config.file_prefix)?;
    validate_file_prefix("skipped_prefix", &config.skipped_prefix)?;

    if config.file_prefix == config.skipped_prefix {
        return Err(ConfigError::Validation(format!(
            "file_prefix and skipped_prefix must differ, both are '{}'",
            config.file_prefix
        )));
    }

    if config.flush_every < 1 {
        return Err(ConfigError::Validation(format!(
            "flush_every must be >= 1, got {}",
            config.flush_every
        )));
    }

    Ok(())
}

fn validate_evaluation_config(config: &EvaluationConfig) -> ConfigResult<()> {
    if !(config.max_avg_time_secs > 0.0) {
        return Err(ConfigError::Validation(format!(
            "max_avg_time_secs must be > 0, got {}",
            config.max_avg_time_secs
        )));
    }

    if !(config.max_error_rate > 0.0 && config.max_error_rate <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "max_error_rate must be in (0, 1], got {}",
            config.max_error_rate
        )));
    }

    Ok(())
}

/// Validates a file name prefix: non-empty, no path separators
fn validate_file_prefix(name: &str, prefix: &str) -> ConfigResult<()> {
    if prefix.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }

    if prefix.contains('/') || prefix.contains('\\') || prefix.contains("..") {
        return Err(ConfigError::Validation(format!(
            "{} must be a plain file name prefix, got '{}'",
            name, prefix
        )));
    }

    Ok(())
}

fn require_positive(name: &str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::Validation(format!("{} must be > 0", name)));
    }
    Ok(())
}
