//! Runtime configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chain_cache::{CacheConfig, DEFAULT_FRESHNESS};
use corpus_source::DEFAULT_MESSAGE_LIMIT;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings for a [`Mimic`](crate::Mimic) deployment.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MimicConfig {
    /// SQLite database holding the `messages` table.
    pub analytics_database: Option<PathBuf>,
    /// Directory for cached whole-scope chains.
    pub cache_dir: PathBuf,
    /// Most messages a chain is built from.
    pub message_limit: usize,
    /// Age in seconds after which a cached chain is rebuilt.
    pub freshness_secs: u64,
}

impl Default for MimicConfig {
    fn default() -> Self {
        MimicConfig {
            analytics_database: None,
            cache_dir: PathBuf::from(".markov_cache"),
            message_limit: DEFAULT_MESSAGE_LIMIT,
            freshness_secs: DEFAULT_FRESHNESS.as_secs(),
        }
    }
}

impl MimicConfig {
    /// Load a JSON config file.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or is not a valid config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            freshness: Duration::from_secs(self.freshness_secs),
            message_limit: self.message_limit,
        }
    }
}
