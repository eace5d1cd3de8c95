//! Name → algorithm lookup

use std::collections::BTreeMap;
use std::sync::Arc;

use super::algorithm::{is_valid_name, BuiltinAlgorithm, ChecksumAlgorithm};
use crate::store::{StoreError, StoreResult};

/// Known checksum algorithms, keyed by name
#[derive(Debug, Clone)]
pub struct ChecksumRegistry {
    algorithms: BTreeMap<String, Arc<dyn ChecksumAlgorithm>>,
}

impl ChecksumRegistry {
    /// An empty registry
    pub fn empty() -> Self {
        Self {
            algorithms: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in algorithm
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for algorithm in BuiltinAlgorithm::ALL {
            registry
                .algorithms
                .insert(algorithm.as_str().to_string(), Arc::new(algorithm));
        }
        registry
    }

    /// Register a custom algorithm.
    ///
    /// The name must match `^[a-z0-9]+$` and must not already be taken.
    pub fn register(&mut self, algorithm: Arc<dyn ChecksumAlgorithm>) -> StoreResult<()> {
        let name = algorithm.name().to_string();
        if !is_valid_name(&name) {
            return Err(StoreError::client(format!(
                "invalid checksum algorithm name '{}'",
                name
            )));
        }
        if self.algorithms.contains_key(&name) {
            return Err(StoreError::client(format!(
                "checksum algorithm '{}' is already registered",
                name
            )));
        }
        self.algorithms.insert(name, algorithm);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ChecksumAlgorithm>> {
        self.algorithms.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.algorithms.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.algorithms.keys().map(String::as_str).collect()
    }
}

impl Default for ChecksumRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
