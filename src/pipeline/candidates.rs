//! Candidate URL input
//!
//! The input is a JSON array of objects. Objects carrying a non-empty `url` string
//! become candidates in input order; everything else is dropped.

use crate::HarvestError;
use serde_json::Value;
use std::path::Path;

/// Loads the candidate sequence from a JSON file
pub fn load_candidates(path: &Path) -> Result<Vec<String>, HarvestError> {
    let content = std::fs::read_to_string(path).map_err(|e| HarvestError::Input {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let candidates = parse_candidates(&content).map_err(|message| HarvestError::Input {
        path: path.to_path_buf(),
        message,
    })?;

    tracing::info!("Found {} URLs to process", candidates.len());
    Ok(candidates)
}

/// Parses candidate JSON
///
/// # Returns
///
/// * `Ok(Vec<String>)` - The URLs in input order
/// * `Err(String)` - The content is not a JSON array
pub fn parse_candidates(content: &str) -> Result<Vec<String>, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let Value::Array(entries) = value else {
        return Err("expected a JSON array of objects".to_string());
    };

    let total = entries.len();
    let urls: Vec<String> = entries
        .iter()
        .filter_map(|entry| entry.get("url").and_then(Value::as_str))
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect();

    if urls.len() < total {
        tracing::debug!("Dropped {} entries without a url", total - urls.len());
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_entries_without_url_dropped() {
        let json = r#"[
            {"url": "https://catalog.test/media/1", "title": "Skull"},
            {"title": "No url"},
            {"url": ""},
            {"url": null},
            {"url": 42},
            "https://catalog.test/media/bare",
            {"url": "https://catalog.test/media/2"}
        ]"#;

        assert_eq!(
            parse_candidates(json).unwrap(),
            vec![
                "https://catalog.test/media/1".to_string(),
                "https://catalog.test/media/2".to_string(),
            ]
        );
    }

    #[test]
    fn test_not_an_array() {
        assert!(parse_candidates(r#"{"url": "x"}"#).is_err());
        assert!(parse_candidates("not json").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_candidates(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, HarvestError::Input { .. }));
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.json");
        std::fs::write(&path, r#"[{"url": "https://catalog.test/media/1"}]"#).unwrap();

        assert_eq!(load_candidates(&path).unwrap().len(), 1);
    }
}
