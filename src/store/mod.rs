//! # Versioned Store
//!
//! A store keeps the version history of one opaque blob in a directory.
//! Every committed write becomes a new immutable version:
//!
//! ```text
//! <dir>/
//!   00000000000000000001_20261019T120000.000000000Z         data
//!   00000000000000000001_20261019T120000.000000000Z.crc32   checksum sidecar
//!   00000000000000000002_20261019T120500.000000000Z
//!   00000000000000000002_20261019T120500.000000000Z.crc32
//! ```
//!
//! # Reads
//!
//! `reader()` walks versions newest first and returns the first one whose
//! checksum verifies. Corrupt, truncated or half-written versions are skipped.
//! Only when nothing verifies does the caller see a data-not-found error.
//!
//! # Writes
//!
//! `writer()` numbers the new version one past the highest number present.
//! The data file is created exclusively, so two writers never share a file.
//! Writers on the same store are otherwise not coordinated; callers
//! serialize writes to the blob.
//!
//! # State
//!
//! The directory listing is the only index. Nothing is cached between
//! calls, so two stores opened on the same directory see each other's
//! writes.

mod clock;
mod errors;
pub mod filename;
mod options;
mod reader;
mod version;
mod writer;


use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{Severity, StoreError, StoreErrorCode, StoreResult};
pub use options::StoreOption;
pub use reader::VersionReader;
pub use version::Version;
pub use writer::VersionWriter;

use crate::checksum::{ChecksumReader, IntegrityChecker, ReadChecksumFn, WriteChecksumFn};
use crate::compaction::{CompactionMode, CompactionPolicy, CompactionReport, Compactor};
use crate::crash_point::{maybe_crash, points};
use crate::directory::{Directory, DirectoryError, LocalDirectory, ReadStream, WriteStream};
use crate::observability::{log_event, Event, Logger, MetricsRegistry};
use crate::subscription::{Subscription, SubscriptionHub};
use crate::task::BackgroundTask;
use options::StoreSettings;

struct StoreInner {
    dir: Arc<dyn Directory>,
    location: String,
    checker: IntegrityChecker,
    clock: Arc<dyn Clock>,
    policy: Arc<dyn CompactionPolicy>,
    mode: CompactionMode,
    hub: SubscriptionHub,
    metrics: Arc<MetricsRegistry>,
    closed: AtomicBool,
    background: Mutex<Option<BackgroundTask>>,
}

impl StoreInner {
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let task = self
            .background
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            task.stop();
        }
        self.hub.close();
        log_event(Event::StoreClose, &[("store", &self.location)]);
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle to an open store. Clones share the same store; dropping the last
/// one closes it.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

/// Non-owning reference to a store, used by background tasks and
/// version handles
#[derive(Clone, Default)]
pub struct WeakStore {
    inner: Weak<StoreInner>,
}

impl WeakStore {
    /// A reference that never upgrades
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upgrade(&self) -> Option<Store> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl fmt::Debug for WeakStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Store {
    /// Open a store over an existing directory.
    ///
    /// The directory must already exist. Options are applied in order.
    pub fn open(dir: Arc<dyn Directory>, options: Vec<StoreOption>) -> StoreResult<Store> {
        let location = dir.location();
        if !dir.exists()? {
            return Err(StoreError::client("store directory does not exist").with_details(location));
        }

        let settings = StoreSettings::from_options(options)?;
        let checker = IntegrityChecker::new(settings.registry, &settings.checksum)?;
        let hub = SubscriptionHub::new(settings.metrics.clone());

        let store = Store {
            inner: Arc::new(StoreInner {
                dir,
                location,
                checker,
                clock: settings.clock,
                policy: settings.policy,
                mode: settings.mode,
                hub,
                metrics: settings.metrics,
                closed: AtomicBool::new(false),
                background: Mutex::new(None),
            }),
        };

        match store.inner.mode {
            CompactionMode::Manual => {}
            CompactionMode::Inline => store.compact_logged(),
            CompactionMode::Background { min_interval } => {
                let task =
                    Compactor::new(store.inner.policy.clone()).spawn(&store, min_interval)?;
                *store
                    .inner
                    .background
                    .lock()
                    .unwrap_or_else(|e| e.into_inner()) = Some(task);
            }
        }

        log_event(
            Event::StoreOpen,
            &[
                ("store", &store.inner.location),
                ("checksum", store.inner.checker.algorithm_name()),
                ("compaction", store.inner.mode.as_str()),
            ],
        );
        Ok(store)
    }

    /// Open a store over a local filesystem path
    pub fn open_path(path: impl AsRef<Path>, options: Vec<StoreOption>) -> StoreResult<Store> {
        Self::open(Arc::new(LocalDirectory::new(path.as_ref())), options)
    }

    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Where the store lives, for display
    pub fn location(&self) -> &str {
        &self.inner.location
    }

    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.inner.dir
    }

    /// Algorithm new versions are sealed with
    pub fn checksum_algorithm(&self) -> &str {
        self.inner.checker.algorithm_name()
    }

    pub fn compaction_mode(&self) -> CompactionMode {
        self.inner.mode
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.inner.metrics
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Close the store: stop background compaction and close every
    /// subscription. Idempotent.
    pub fn close(&self) {
        self.inner.close();
    }

    pub(crate) fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            Err(StoreError::closed())
        } else {
            Ok(())
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    // ---- listing ----

    /// All versions present, newest first.
    ///
    /// Listing does not verify checksums.
    pub fn versions(&self) -> StoreResult<Vec<Version>> {
        self.ensure_open()?;
        self.scan()
    }

    /// Highest-numbered version present, verified or not
    pub fn latest_version(&self) -> StoreResult<Option<Version>> {
        Ok(self.versions()?.into_iter().next())
    }

    fn scan(&self) -> StoreResult<Vec<Version>> {
        let files = self.inner.dir.list_files()?;

        let mut sidecars: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut data = Vec::new();
        for file in &files {
            if let Ok((number, time)) = filename::parse(file) {
                data.push((file.as_str(), number, time));
            } else if let Some((owner, algorithm)) = filename::split_sidecar(file) {
                sidecars.entry(owner).or_default().push(algorithm);
            }
        }

        let preferred = self.inner.checker.algorithm_name();
        let weak = self.downgrade();
        let mut versions: Vec<Version> = data
            .into_iter()
            .map(|(name, number, time)| {
                let algorithm = sidecars.get(name).and_then(|algs| {
                    algs.iter()
                        .find(|a| **a == preferred)
                        .or_else(|| algs.iter().find(|a| self.inner.checker.supports(a)))
                        .or_else(|| algs.first())
                        .map(|a| a.to_string())
                });
                Version::new(weak.clone(), number, time, name.to_string(), algorithm)
            })
            .collect();

        versions.sort_by(|a, b| {
            b.number()
                .cmp(&a.number())
                .then_with(|| b.created_at().cmp(&a.created_at()))
        });
        Ok(versions)
    }

    // ---- writing ----

    /// Start a new version stamped with the current time
    pub fn writer(&self) -> StoreResult<VersionWriter> {
        self.ensure_open()?;
        let number = self.next_number()?;
        self.create_writer(number, self.now())
    }

    /// Start a new version with a fixed creation time.
    ///
    /// Fails with a conflict if a version with exactly that time exists.
    pub fn writer_at(&self, time: DateTime<Utc>) -> StoreResult<VersionWriter> {
        self.ensure_open()?;
        let versions = self.scan()?;
        if versions.iter().any(|v| v.created_at() == time) {
            return Err(StoreError::conflict(format!(
                "a version created at {} already exists",
                time.to_rfc3339()
            ))
            .with_details(self.inner.location.clone()));
        }
        let number = next_after(&versions)?;
        self.create_writer(number, time)
    }

    fn next_number(&self) -> StoreResult<u64> {
        next_after(&self.scan()?)
    }

    fn create_writer(&self, number: u64, time: DateTime<Utc>) -> StoreResult<VersionWriter> {
        filename::check_time(time)
            .map_err(|e| StoreError::client(e.to_string()).with_source(e))?;
        let name = filename::generate(number, time);
        let raw = match self.inner.dir.open_writer(&name) {
            Ok(raw) => raw,
            Err(DirectoryError::AlreadyExists(_)) => {
                return Err(StoreError::conflict(format!("{} already exists", name)))
            }
            Err(e) => return Err(e.into()),
        };

        let dir = self.inner.dir.clone();
        let data_name = name.clone();
        let write_checksum: WriteChecksumFn =
            Box::new(move |algorithm: &str, digest: &[u8]| -> io::Result<()> {
                let mut sidecar = dir.open_writer(&filename::sidecar_name(&data_name, algorithm))?;
                sidecar.write_all(digest)?;
                sidecar.sync()
            });

        let inner = self.inner.checker.decorate_writer(raw, &name, write_checksum);
        Ok(VersionWriter::new(self.clone(), inner, number, time, name))
    }

    /// Bookkeeping after a writer commits
    pub(crate) fn committed(&self, version: &Version, bytes: u64) {
        self.inner.metrics.record_version_written(bytes);
        log_event(
            Event::VersionCommit,
            &[
                ("store", &self.inner.location),
                ("version", &version.number().to_string()),
                ("bytes", &bytes.to_string()),
                ("checksum", version.algorithm().unwrap_or("")),
            ],
        );
        self.inner.hub.notify();
        if self.inner.mode == CompactionMode::Inline {
            self.compact_logged();
        }
    }

    /// Write `data` as a new version
    pub fn write_bytes(&self, data: &[u8]) -> StoreResult<Version> {
        let mut writer = self.writer()?;
        writer.write_all(data)?;
        writer.close()
    }

    // ---- reading ----

    /// Open the newest version that passes verification.
    ///
    /// Versions that fail are skipped; if none passes the result is a
    /// data-not-found error.
    pub fn reader(&self) -> StoreResult<VersionReader> {
        self.ensure_open()?;
        let versions = self.scan()?;
        let examined = versions.len();

        for version in &versions {
            match self.open_verified(version) {
                Ok(reader) => {
                    self.inner.metrics.increment_reads_resolved();
                    log_event(
                        Event::ReadResolved,
                        &[
                            ("store", &self.inner.location),
                            ("version", &version.number().to_string()),
                        ],
                    );
                    return Ok(reader);
                }
                Err(e) => {
                    self.inner.metrics.increment_read_fallbacks();
                    log_event(
                        Event::ReadFallback,
                        &[
                            ("store", &self.inner.location),
                            ("version", &version.number().to_string()),
                            ("reason", e.message()),
                        ],
                    );
                }
            }
        }

        self.inner.metrics.increment_reads_exhausted();
        log_event(
            Event::ReadExhausted,
            &[
                ("store", &self.inner.location),
                ("examined", &examined.to_string()),
            ],
        );
        Err(StoreError::data_not_found(format!(
            "no intact version among {} present",
            examined
        ))
        .with_details(self.inner.location.clone()))
    }

    /// Open the newest intact version created at exactly `time`
    pub fn reader_at(&self, time: DateTime<Utc>) -> StoreResult<VersionReader> {
        self.ensure_open()?;
        let mut last_error = None;
        for version in self.scan()?.iter().filter(|v| v.created_at() == time) {
            match self.open_verified(version) {
                Ok(reader) => return Ok(reader),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            StoreError::version_not_found(format!(
                "no version created at {}",
                time.to_rfc3339()
            ))
        }))
    }

    /// Read the newest intact version in full
    pub fn read_bytes(&self) -> StoreResult<Vec<u8>> {
        let mut reader = self.reader()?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        reader.close()?;
        Ok(data)
    }

    /// Read `version` through in full and compare its checksum
    pub fn verify(&self, version: &Version) -> StoreResult<()> {
        self.ensure_open()?;
        let result = self.open_checked(version).and_then(|reader| reader.close());
        if let Err(ref e) = result {
            if e.is_checksum_mismatch() {
                self.inner.metrics.increment_checksum_mismatches();
            }
        }
        result
    }

    pub(crate) fn open_verified(&self, version: &Version) -> StoreResult<VersionReader> {
        self.verify(version)?;
        let reader = self.open_checked(version)?;
        Ok(VersionReader::new(
            reader,
            version.clone(),
            self.inner.metrics.clone(),
        ))
    }

    fn open_checked(&self, version: &Version) -> StoreResult<ChecksumReader<Box<dyn ReadStream>>> {
        let algorithm = version.algorithm().ok_or_else(|| {
            StoreError::checksum_mismatch(version.name(), "none")
                .with_details("no checksum file")
        })?;
        let raw = self.inner.dir.open_reader(version.name())?;

        let dir = self.inner.dir.clone();
        let data_name = version.name().to_string();
        let read_checksum: ReadChecksumFn = Box::new(move |algorithm: &str| -> io::Result<Vec<u8>> {
            let mut sidecar = dir.open_reader(&filename::sidecar_name(&data_name, algorithm))?;
            let mut digest = Vec::new();
            sidecar.read_to_end(&mut digest)?;
            Ok(digest)
        });

        self.inner
            .checker
            .decorate_reader(raw, version.name(), algorithm, read_checksum)
    }

    // ---- deletion ----

    /// Delete every version created at exactly `time`.
    ///
    /// Returns how many were removed; none is a version-not-found error.
    pub fn delete_version(&self, time: DateTime<Utc>) -> StoreResult<usize> {
        self.ensure_open()?;
        let matching: Vec<Version> = self
            .scan()?
            .into_iter()
            .filter(|v| v.created_at() == time)
            .collect();
        if matching.is_empty() {
            return Err(StoreError::version_not_found(format!(
                "no version created at {}",
                time.to_rfc3339()
            )));
        }
        for version in &matching {
            self.remove_version(version)?;
        }
        Ok(matching.len())
    }

    pub(crate) fn remove_version(&self, version: &Version) -> StoreResult<()> {
        self.ensure_open()?;
        // Sidecars first; an interrupted removal leaves an unverifiable data file.
        for file in self.inner.dir.list_files()? {
            if let Some((owner, _)) = filename::split_sidecar(&file) {
                if owner == version.name() {
                    self.inner.dir.delete_file(&file)?;
                }
            }
        }
        maybe_crash(points::DELETE_BETWEEN_FILES);
        self.inner.dir.delete_file(version.name())?;

        self.inner.metrics.add_versions_deleted(1);
        log_event(
            Event::VersionDelete,
            &[
                ("store", &self.inner.location),
                ("version", &version.number().to_string()),
            ],
        );
        Ok(())
    }

    // ---- maintenance ----

    /// Run one compaction pass with the store's policy
    pub fn compact(&self) -> StoreResult<CompactionReport> {
        self.ensure_open()?;
        Compactor::new(self.inner.policy.clone()).run_once(self)
    }

    fn compact_logged(&self) {
        if let Err(e) = self.compact() {
            Logger::warn(
                "COMPACTION_PASS_FAILED",
                &[("store", &self.inner.location), ("error", &e.to_string())],
            );
        }
    }

    /// Register for "new version committed" notifications
    pub fn subscribe(&self) -> StoreResult<Subscription> {
        self.ensure_open()?;
        Ok(self.inner.hub.subscribe())
    }
}

fn next_after(versions: &[Version]) -> StoreResult<u64> {
    let highest = versions.iter().map(|v| v.number()).max().unwrap_or(0);
    highest
        .checked_add(1)
        .ok_or_else(|| StoreError::client("version numbers exhausted"))
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("location", &self.inner.location)
            .field("checksum", &self.inner.checker.algorithm_name())
            .field("compaction", &self.inner.mode)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn manual() -> Vec<StoreOption> {
        vec![StoreOption::CompactionMode(CompactionMode::Manual)]
    }

    fn memory_store(dir: &MemoryDirectory, options: Vec<StoreOption>) -> Store {
        Store::open(Arc::new(dir.clone()), options).unwrap()
    }

    fn time(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_open_missing_directory_is_client_error() {
        let temp = TempDir::new().unwrap();
        let err = Store::open_path(temp.path().join("missing"), Vec::new()).unwrap_err();
        assert!(err.is_client_error());
        assert!(!err.is_data_not_found());
    }

    #[test]
    fn test_open_missing_subdirectory_is_client_error() {
        let dir = MemoryDirectory::new();
        let sub = dir.subdirectory("nope").unwrap();
        assert!(Store::open(sub, Vec::new()).unwrap_err().is_client_error());
    }

    #[test]
    fn test_empty_store_has_no_data() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, Vec::new());
        assert!(store.versions().unwrap().is_empty());
        assert!(store.latest_version().unwrap().is_none());
        assert!(store.reader().unwrap_err().is_data_not_found());
    }

    #[test]
    fn test_write_and_read_on_disk() {
        let temp = TempDir::new().unwrap();
        let store = Store::open_path(temp.path(), Vec::new()).unwrap();
        let version = store.write_bytes(b"persisted").unwrap();
        assert_eq!(version.number(), 1);
        assert_eq!(version.algorithm(), Some("crc32"));
        assert_eq!(version.size().unwrap(), 9);
        assert_eq!(store.read_bytes().unwrap(), b"persisted");

        let reopened = Store::open_path(temp.path(), Vec::new()).unwrap();
        assert_eq!(reopened.read_bytes().unwrap(), b"persisted");
    }

    #[test]
    fn test_version_numbers_increase() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, manual());
        for expected in 1..=4 {
            assert_eq!(store.write_bytes(b"x").unwrap().number(), expected);
        }
        let numbers: Vec<u64> = store.versions().unwrap().iter().map(|v| v.number()).collect();
        assert_eq!(numbers, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_empty_blob_is_a_version() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, Vec::new());
        let version = store.write_bytes(b"").unwrap();
        assert_eq!(version.size().unwrap(), 0);
        assert_eq!(store.read_bytes().unwrap(), b"");
    }

    #[test]
    fn test_foreign_files_ignored() {
        let dir = MemoryDirectory::new();
        dir.put_file("README", b"hello").unwrap();
        dir.put_file("00000000000000000009_garbage", b"x").unwrap();
        let store = memory_store(&dir, Vec::new());
        assert!(store.versions().unwrap().is_empty());
        store.write_bytes(b"data").unwrap();
        assert_eq!(store.versions().unwrap().len(), 1);
    }

    #[test]
    fn test_unsealed_version_skipped() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, manual());
        store.write_bytes(b"sealed").unwrap();
        dir.put_file(&filename::generate(2, time(10)), b"partial").unwrap();

        assert_eq!(store.versions().unwrap()[0].algorithm(), None);
        assert_eq!(store.read_bytes().unwrap(), b"sealed");
        assert_eq!(store.write_bytes(b"next").unwrap().number(), 3);
    }

    #[test]
    fn test_writer_at_and_reader_at() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, manual());
        let mut writer = store.writer_at(time(100)).unwrap();
        writer.write_all(b"pinned").unwrap();
        let version = writer.close().unwrap();
        assert_eq!(version.created_at(), time(100));

        let err = store.writer_at(time(100)).unwrap_err();
        assert!(err.is_conflict());

        let mut reader = store.reader_at(time(100)).unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();
        reader.close().unwrap();
        assert_eq!(data, b"pinned");

        assert!(store.reader_at(time(5)).unwrap_err().is_version_not_found());
    }

    #[test]
    fn test_verify_reports_mismatch() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, manual());
        let version = store.write_bytes(b"abc").unwrap();
        store.verify(&version).unwrap();

        dir.corrupt_byte(version.name(), 1).unwrap();
        assert!(store.verify(&version).unwrap_err().is_checksum_mismatch());
        assert_eq!(store.metrics().snapshot().checksum_mismatches, 1);
    }

    #[test]
    fn test_corruption_after_open_surfaces_at_close() {
        let temp = TempDir::new().unwrap();
        let store = Store::open_path(temp.path(), Vec::new()).unwrap();
        let version = store.write_bytes(b"stable bytes").unwrap();

        let mut reader = store.reader().unwrap();
        let path = temp.path().join(version.name());
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let mut data = Vec::new();
        let _ = reader.read_to_end(&mut data);
        let err = reader.close().unwrap_err();
        assert!(err.is_checksum_mismatch());
    }

    #[test]
    fn test_version_reader_and_remove() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, manual());
        let first = store.write_bytes(b"first").unwrap();
        store.write_bytes(b"second").unwrap();

        let mut reader = first.reader().unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();
        assert_eq!(reader.version(), &first);
        reader.close().unwrap();
        assert_eq!(data, b"first");

        first.remove().unwrap();
        assert_eq!(store.versions().unwrap().len(), 1);
        assert_eq!(dir.list_files().unwrap().len(), 2);
    }

    #[test]
    fn test_closed_store_rejects_operations() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, Vec::new());
        let version = store.write_bytes(b"x").unwrap();
        store.close();
        store.close();

        assert!(store.is_closed());
        assert!(store.writer().unwrap_err().is_client_error());
        assert!(store.reader().unwrap_err().is_client_error());
        assert!(store.versions().unwrap_err().is_client_error());
        assert!(store.subscribe().unwrap_err().is_client_error());
        assert!(store.delete_version(version.created_at()).unwrap_err().is_client_error());
        assert!(version.reader().unwrap_err().is_client_error());
    }

    #[test]
    fn test_writer_open_across_close_aborts() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, Vec::new());
        let mut writer = store.writer().unwrap();
        writer.write_all(b"late").unwrap();
        store.close();
        assert!(writer.close().unwrap_err().is_client_error());
        assert!(dir.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_dropping_last_handle_closes_subscriptions() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, Vec::new());
        let mut sub = store.subscribe().unwrap();
        let weak = store.downgrade();
        drop(store);
        assert!(weak.upgrade().is_none());
        assert_eq!(sub.try_changed(), Some(false));
    }

    #[test]
    fn test_commit_notifies_subscribers() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, Vec::new());
        let mut sub = store.subscribe().unwrap();
        assert_eq!(sub.try_changed(), None);
        store.write_bytes(b"x").unwrap();
        assert_eq!(sub.try_changed(), Some(true));
    }

    #[test]
    fn test_inline_compaction_runs_after_commit() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, vec![StoreOption::retain_newest(2).unwrap()]);
        for i in 0..5u8 {
            store.write_bytes(&[i]).unwrap();
        }
        let numbers: Vec<u64> = store.versions().unwrap().iter().map(|v| v.number()).collect();
        assert_eq!(numbers, vec![5, 4]);
    }

    #[test]
    fn test_inline_compaction_runs_at_open() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, manual());
        for i in 0..4u8 {
            store.write_bytes(&[i]).unwrap();
        }
        drop(store);

        let store = memory_store(&dir, Vec::new());
        assert_eq!(store.versions().unwrap().len(), 2);
    }

    #[test]
    fn test_background_mode_needs_runtime() {
        let dir = MemoryDirectory::new();
        let err = Store::open(
            Arc::new(dir),
            vec![StoreOption::CompactionMode(CompactionMode::Background {
                min_interval: std::time::Duration::from_secs(1),
            })],
        )
        .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_manual_clock_stamps_versions() {
        let dir = MemoryDirectory::new();
        let clock = Arc::new(ManualClock::new(time(1_000)));
        let store = memory_store(
            &dir,
            vec![StoreOption::Clock(clock.clone()), StoreOption::CompactionMode(CompactionMode::Manual)],
        );
        let a = store.write_bytes(b"a").unwrap();
        clock.advance(chrono::Duration::seconds(60));
        let b = store.write_bytes(b"b").unwrap();
        assert_eq!(a.created_at(), time(1_000));
        assert_eq!(b.created_at(), time(1_060));
    }

    #[test]
    fn test_metrics_track_reads_and_writes() {
        let dir = MemoryDirectory::new();
        let store = memory_store(&dir, manual());
        store.write_bytes(b"12345").unwrap();
        store.read_bytes().unwrap();
        let snapshot = store.metrics().snapshot();
        assert_eq!(snapshot.versions_written, 1);
        assert_eq!(snapshot.bytes_written, 5);
        assert_eq!(snapshot.reads_resolved, 1);
    }
}
