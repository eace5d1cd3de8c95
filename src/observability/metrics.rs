//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one store (or several, when shared)
///
/// All counters use Relaxed ordering; readers see eventually consistent values.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    versions_written: AtomicU64,
    bytes_written: AtomicU64,
    versions_aborted: AtomicU64,
    reads_resolved: AtomicU64,
    read_fallbacks: AtomicU64,
    reads_exhausted: AtomicU64,
    checksum_mismatches: AtomicU64,
    versions_deleted: AtomicU64,
    compaction_runs: AtomicU64,
    replications: AtomicU64,
    replication_failures: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_coalesced: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Write path

    /// Record a committed version of `bytes` bytes
    pub fn record_version_written(&self, bytes: u64) {
        self.versions_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_versions_aborted(&self) {
        self.versions_aborted.fetch_add(1, Ordering::Relaxed);
    }

    // Read path

    pub fn increment_reads_resolved(&self) {
        self.reads_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_read_fallbacks(&self) {
        self.read_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reads_exhausted(&self) {
        self.reads_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_checksum_mismatches(&self) {
        self.checksum_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    // Maintenance

    pub fn add_versions_deleted(&self, count: u64) {
        self.versions_deleted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_compaction_runs(&self) {
        self.compaction_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_replications(&self) {
        self.replications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_replication_failures(&self) {
        self.replication_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Notifications

    pub fn increment_notifications_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_notifications_coalesced(&self) {
        self.notifications_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            versions_written: self.versions_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            versions_aborted: self.versions_aborted.load(Ordering::Relaxed),
            reads_resolved: self.reads_resolved.load(Ordering::Relaxed),
            read_fallbacks: self.read_fallbacks.load(Ordering::Relaxed),
            reads_exhausted: self.reads_exhausted.load(Ordering::Relaxed),
            checksum_mismatches: self.checksum_mismatches.load(Ordering::Relaxed),
            versions_deleted: self.versions_deleted.load(Ordering::Relaxed),
            compaction_runs: self.compaction_runs.load(Ordering::Relaxed),
            replications: self.replications.load(Ordering::Relaxed),
            replication_failures: self.replication_failures.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_coalesced: self.notifications_coalesced.load(Ordering::Relaxed),
        }
    }

    /// Current values as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub versions_written: u64,
    pub bytes_written: u64,
    pub versions_aborted: u64,
    pub reads_resolved: u64,
    pub read_fallbacks: u64,
    pub reads_exhausted: u64,
    pub checksum_mismatches: u64,
    pub versions_deleted: u64,
    pub compaction_runs: u64,
    pub replications: u64,
    pub replication_failures: u64,
    pub notifications_sent: u64,
    pub notifications_coalesced: u64,
}
