use crate::config::types::Config;
use crate::config::validation::validate;
use crate::{ConfigResult, HarvestError};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
///
/// Missing sections and keys fall back to their defaults.
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is stored next to the batch checkpoint to detect configuration changes
/// between invocations of the same run.
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Resolves the configuration of one invocation
///
/// Without a path every key takes its default and there is no hash to compare
/// checkpoints against.
///
/// # Returns
///
/// * `Ok((Config, Some(hash)))` - The file loaded and validated
/// * `Ok((Config, None))` - No file was given
/// * `Err(HarvestError::Config)` - The file could not be loaded or is invalid
pub fn load_run_config(path: Option<&Path>) -> Result<(Config, Option<String>), HarvestError> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok((Config::default(), None));
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok((config, Some(hash)))
}
