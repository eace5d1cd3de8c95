//! Store configuration file
//!
//! A JSON document whose fields all have defaults, so `{}` is a valid
//! configuration:
//!
//! ```json
//! {
//!   "checksum": "crc32",
//!   "retain": 2,
//!   "retain_within_secs": null,
//!   "compaction": "inline",
//!   "compaction_interval_ms": 60000
//! }
//! ```
//!
//! `compaction` is one of `manual`, `inline` or `background`.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checksum::ChecksumRegistry;
use crate::compaction::{CompactionMode, RetainWithin};
use crate::store::{StoreError, StoreOption, StoreResult};

/// Problems reading or validating a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for StoreError {
    fn from(err: ConfigError) -> Self {
        StoreError::client(err.to_string()).with_source(err)
    }
}

/// Store settings as read from a configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Algorithm for new versions
    #[serde(default = "default_checksum")]
    pub checksum: String,

    /// Number of newest versions to keep
    #[serde(default = "default_retain")]
    pub retain: usize,

    /// Keep versions younger than this instead of a fixed count
    #[serde(default)]
    pub retain_within_secs: Option<u64>,

    /// "manual", "inline" or "background"
    #[serde(default = "default_compaction")]
    pub compaction: String,

    /// Polling floor for background compaction
    #[serde(default = "default_compaction_interval_ms")]
    pub compaction_interval_ms: u64,
}

fn default_checksum() -> String {
    "crc32".to_string()
}
fn default_retain() -> usize {
    2
}
fn default_compaction() -> String {
    "inline".to_string()
}
fn default_compaction_interval_ms() -> u64 {
    60_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            checksum: default_checksum(),
            retain: default_retain(),
            retain_within_secs: None,
            compaction: default_compaction(),
            compaction_interval_ms: default_compaction_interval_ms(),
        }
    }
}

impl StoreConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a configuration document
    pub fn from_json(content: &str) -> StoreResult<Self> {
        let config: StoreConfig = serde_json::from_str(content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field; all failures are client errors
    pub fn validate(&self) -> StoreResult<()> {
        if !ChecksumRegistry::with_builtins().contains(&self.checksum) {
            return Err(ConfigError::Invalid(format!(
                "unknown checksum algorithm '{}'",
                self.checksum
            ))
            .into());
        }

        if self.retain == 0 {
            return Err(ConfigError::Invalid("retain must be > 0".to_string()).into());
        }

        if self.retain_within_secs == Some(0) {
            return Err(ConfigError::Invalid("retain_within_secs must be > 0".to_string()).into());
        }

        self.compaction_mode()?;
        Ok(())
    }

    /// The compaction mode this configuration names
    pub fn compaction_mode(&self) -> StoreResult<CompactionMode> {
        match self.compaction.as_str() {
            "manual" => Ok(CompactionMode::Manual),
            "inline" => Ok(CompactionMode::Inline),
            "background" => {
                if self.compaction_interval_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "compaction_interval_ms must be > 0 in background mode".to_string(),
                    )
                    .into());
                }
                Ok(CompactionMode::Background {
                    min_interval: Duration::from_millis(self.compaction_interval_ms),
                })
            }
            other => Err(ConfigError::Invalid(format!(
                "unknown compaction mode '{}'. Must be 'manual', 'inline' or 'background'.",
                other
            ))
            .into()),
        }
    }

    /// Options for [`Store::open`](crate::store::Store::open)
    pub fn to_options(&self) -> StoreResult<Vec<StoreOption>> {
        self.validate()?;
        let retention = match self.retain_within_secs {
            Some(secs) => StoreOption::Compaction(Arc::new(RetainWithin::new(
                Duration::from_secs(secs),
            ))),
            None => StoreOption::retain_newest(self.retain)?,
        };
        Ok(vec![
            StoreOption::checksum(self.checksum.clone()),
            retention,
            StoreOption::CompactionMode(self.compaction_mode()?),
        ])
    }
}
