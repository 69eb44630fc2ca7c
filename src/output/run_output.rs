//! Run-output channel
//!
//! An orchestrating caller can pass a file path; each invocation appends `key=value`
//! lines to it. Without a path the values are only logged. Write failures are logged
//! and never change the outcome of the invocation.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends `key=value` lines to an optional sink
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    path: Option<PathBuf>,
    entries: Vec<(String, String)>,
}

impl RunOutput {
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
            entries: Vec::new(),
        }
    }

    /// Queues one value; booleans render as `true`/`false`
    pub fn set(&mut self, key: &str, value: impl Display) -> &mut Self {
        self.entries.push((key.to_string(), value.to_string()));
        self
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Appends every queued value to the sink
    pub fn write(&self) {
        for (key, value) in &self.entries {
            tracing::info!("{}={}", key, value);
        }

        let Some(path) = &self.path else {
            return;
        };

        if let Err(e) = self.append(path) {
            tracing::warn!("Could not write run output to {}: {}", path.display(), e);
        }
    }

    fn append(&self, path: &Path) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut lines = String::new();
        for (key, value) in &self.entries {
            lines.push_str(&format!("{}={}\n", key, value));
        }
        file.write_all(lines.as_bytes())
    }
}
