//! Version handles

use std::fmt;

use chrono::{DateTime, Utc};

use super::errors::{StoreError, StoreResult};
use super::reader::VersionReader;
use super::{Store, WeakStore};

/// One immutable snapshot as listed from the store directory.
///
/// A handle does not keep its store open; operations on it fail with a
/// closed-store error once the store is gone.
#[derive(Clone)]
pub struct Version {
    store: WeakStore,
    number: u64,
    created_at: DateTime<Utc>,
    name: String,
    algorithm: Option<String>,
}

impl Version {
    pub(crate) fn new(
        store: WeakStore,
        number: u64,
        created_at: DateTime<Utc>,
        name: String,
        algorithm: Option<String>,
    ) -> Self {
        Self {
            store,
            number,
            created_at,
            name,
            algorithm,
        }
    }

    /// Version number, assigned in write order
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Data file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Algorithm of the checksum sidecar, if one exists
    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    fn store(&self) -> StoreResult<Store> {
        self.store.upgrade().ok_or_else(StoreError::closed)
    }

    /// Size of the data file in bytes
    pub fn size(&self) -> StoreResult<u64> {
        let store = self.store()?;
        store.ensure_open()?;
        Ok(store.directory().file_len(&self.name)?)
    }

    /// Open this exact version for reading, verifying it first
    pub fn reader(&self) -> StoreResult<VersionReader> {
        self.store()?.open_verified(self)
    }

    /// Delete the data file and its checksum sidecar
    pub fn remove(&self) -> StoreResult<()> {
        self.store()?.remove_version(self)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number && self.name == other.name
    }
}

impl Eq for Version {}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Version")
            .field("number", &self.number)
            .field("created_at", &self.created_at)
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{} ({})", self.number, self.created_at.to_rfc3339())
    }
}
