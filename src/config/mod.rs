//! Configuration module for Media-Harvest
//!
//! This module handles loading, parsing, and validating the optional TOML configuration
//! file. Every key has a default, so a harvest can run without any file at all.
//!
//! # Example
//!
//! ```no_run
//! use media_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Retry budget per record: {}", config.retry.max_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DetectionConfig, EvaluationConfig, FetcherConfig, OutputConfig, RetryConfig,
    SiteConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, load_run_config, parse_config,
};
pub use validation::validate;
