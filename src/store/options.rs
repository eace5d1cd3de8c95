//! Store options

use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::errors::{StoreError, StoreResult};
use crate::checksum::{BuiltinAlgorithm, ChecksumAlgorithm, ChecksumRegistry};
use crate::compaction::{CompactionMode, CompactionPolicy, RetainNewest};
use crate::observability::MetricsRegistry;

/// A setting applied when opening a store. Later options win.
#[derive(Debug, Clone)]
pub enum StoreOption {
    /// Write new versions with the named algorithm
    Checksum(String),
    /// Register a custom algorithm and write new versions with it
    ChecksumAlgorithm(Arc<dyn ChecksumAlgorithm>),
    /// Retention policy
    Compaction(Arc<dyn CompactionPolicy>),
    /// When compaction runs
    CompactionMode(CompactionMode),
    /// Time source for version timestamps
    Clock(Arc<dyn Clock>),
    /// Counter registry, possibly shared with other stores
    Metrics(Arc<MetricsRegistry>),
}

impl StoreOption {
    pub fn checksum(name: impl Into<String>) -> Self {
        StoreOption::Checksum(name.into())
    }

    pub fn retain_newest(count: usize) -> StoreResult<Self> {
        Ok(StoreOption::Compaction(Arc::new(RetainNewest::new(count)?)))
    }
}

/// Options resolved into concrete settings
#[derive(Debug)]
pub(crate) struct StoreSettings {
    pub registry: ChecksumRegistry,
    pub checksum: String,
    pub policy: Arc<dyn CompactionPolicy>,
    pub mode: CompactionMode,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<MetricsRegistry>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            registry: ChecksumRegistry::with_builtins(),
            checksum: BuiltinAlgorithm::DEFAULT.as_str().to_string(),
            policy: Arc::new(RetainNewest::default()),
            mode: CompactionMode::default(),
            clock: Arc::new(SystemClock),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }
}

impl StoreSettings {
    pub fn from_options(options: Vec<StoreOption>) -> StoreResult<Self> {
        let mut settings = Self::default();
        for option in options {
            match option {
                StoreOption::Checksum(name) => settings.checksum = name,
                StoreOption::ChecksumAlgorithm(algorithm) => {
                    settings.checksum = algorithm.name().to_string();
                    settings.registry.register(algorithm)?;
                }
                StoreOption::Compaction(policy) => settings.policy = policy,
                StoreOption::CompactionMode(mode) => {
                    if let CompactionMode::Background { min_interval } = mode {
                        if min_interval.is_zero() {
                            return Err(StoreError::client("compaction interval must be non-zero"));
                        }
                    }
                    settings.mode = mode;
                }
                StoreOption::Clock(clock) => settings.clock = clock,
                StoreOption::Metrics(metrics) => settings.metrics = metrics,
            }
        }
        if !settings.registry.contains(&settings.checksum) {
            return Err(StoreError::client(format!(
                "unknown checksum algorithm '{}'",
                settings.checksum
            )));
        }
        Ok(settings)
    }
}
