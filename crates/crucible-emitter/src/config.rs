//! Emitter configuration.
//!
//! ```toml
//! name = "kiln"
//! default_priority = 10
//! max_use_depth = 8
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading an [`EmitterConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read emitter config {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML was invalid
    #[error("failed to parse emitter config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for an [`EventEmitter`](crate::EventEmitter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Label attached to log records
    pub name: Option<String>,

    /// Priority given to listeners registered with `on` (higher = earlier)
    pub default_priority: i32,

    /// Deepest chain of composed emitters an emission may walk.
    ///
    /// `None` leaves recursion unguarded, so an emitter that uses itself
    /// recurses until the stack runs out.
    pub max_use_depth: Option<usize>,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            name: None,
            default_priority: 0,
            max_use_depth: None,
        }
    }
}

impl EmitterConfig {
    /// Set the log label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the priority used by `on`.
    pub fn with_default_priority(mut self, priority: i32) -> Self {
        self.default_priority = priority;
        self
    }

    /// Guard composition depth.
    pub fn with_max_use_depth(mut self, depth: usize) -> Self {
        self.max_use_depth = Some(depth);
        self
    }

    /// Parse from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), name = ?config.name, "Loaded emitter config");
        Ok(config)
    }

    /// Label used in log records.
    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("emitter")
    }
}
