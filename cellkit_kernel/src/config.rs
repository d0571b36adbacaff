//! Kernel configuration.
//!
//! Loaded from JSON or built in code:
//!
//! ```json
//! { "workflow_name": "nightly-etl", "strict_lint": true, "honor_cancellation": true }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Error types for configuration loading.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration is not valid JSON for this schema.
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Kernel configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Name reported in run state; defaults to the definition name
    pub workflow_name: Option<String>,
    /// Refuse to run when any lint message exists
    pub strict_lint: bool,
    /// Poll the cancellation token at step boundaries
    pub honor_cancellation: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            workflow_name: None,
            strict_lint: false,
            honor_cancellation: true,
        }
    }
}

impl KernelConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the workflow name.
    pub fn with_workflow_name(mut self, name: impl Into<String>) -> Self {
        self.workflow_name = Some(name.into());
        self
    }

    /// Sets strict lint mode.
    pub fn with_strict_lint(mut self, strict: bool) -> Self {
        self.strict_lint = strict;
        self
    }

    /// Sets whether the cancellation token is polled.
    pub fn with_honor_cancellation(mut self, honor: bool) -> Self {
        self.honor_cancellation = honor;
        self
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&text)
    }
}
