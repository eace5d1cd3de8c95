//! Observable store events
//!
//! Every log line the store emits names one of these events.

use std::fmt;

use super::logger::Severity;

/// Observable events in a store's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Store opened against a directory
    StoreOpen,
    /// Store closed
    StoreClose,

    // Write path
    /// Writer committed a new version
    VersionCommit,
    /// Writer aborted, partial files removed
    VersionAbort,
    /// Version deleted (manually or by compaction)
    VersionDelete,

    // Read path
    /// Read resolution settled on a version
    ReadResolved,
    /// A candidate failed verification, trying an older one
    ReadFallback,
    /// No candidate could be verified
    ReadExhausted,

    // Compaction
    /// Compaction pass started
    CompactionBegin,
    /// Compaction pass finished
    CompactionComplete,
    /// Compaction declined to delete anything
    CompactionSkipped,

    // Replication
    /// Replication pass started
    ReplicationBegin,
    /// Replication copied a version
    ReplicationComplete,
    /// Destination already current
    ReplicationUpToDate,
    /// Replication pass failed
    ReplicationFailed,

    // Notifications
    /// A subscriber already had a pending notification
    SubscriptionCoalesced,
}

impl Event {
    /// Returns the event name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreOpen => "STORE_OPEN",
            Event::StoreClose => "STORE_CLOSE",
            Event::VersionCommit => "VERSION_COMMIT",
            Event::VersionAbort => "VERSION_ABORT",
            Event::VersionDelete => "VERSION_DELETE",
            Event::ReadResolved => "READ_RESOLVED",
            Event::ReadFallback => "READ_FALLBACK",
            Event::ReadExhausted => "READ_EXHAUSTED",
            Event::CompactionBegin => "COMPACTION_BEGIN",
            Event::CompactionComplete => "COMPACTION_COMPLETE",
            Event::CompactionSkipped => "COMPACTION_SKIPPED",
            Event::ReplicationBegin => "REPLICATION_BEGIN",
            Event::ReplicationComplete => "REPLICATION_COMPLETE",
            Event::ReplicationUpToDate => "REPLICATION_UP_TO_DATE",
            Event::ReplicationFailed => "REPLICATION_FAILED",
            Event::SubscriptionCoalesced => "SUBSCRIPTION_COALESCED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ReadFallback | Event::ReadExhausted | Event::CompactionSkipped => {
                Severity::Warn
            }
            Event::ReplicationFailed => Severity::Error,
            Event::SubscriptionCoalesced | Event::ReplicationUpToDate => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
