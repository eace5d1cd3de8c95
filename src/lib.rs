//! vstore - An embedded, versioned, integrity-checked object store
//!
//! Every write produces a new immutable version: a data file plus a
//! checksum sidecar named after the algorithm that sealed it. Reads resolve
//! to the newest version that still verifies, so a torn or corrupted write
//! falls back to the previous intact one. Old versions are trimmed by a
//! retention policy, writers can be observed through subscriptions, and a
//! replicator keeps a destination store current with a set of sources.
//!
//! ```no_run
//! use vstore::{Store, StoreOption};
//!
//! # fn main() -> vstore::StoreResult<()> {
//! let store = Store::open_path("/var/lib/app/state", vec![StoreOption::checksum("sha256")])?;
//! store.write_bytes(b"hello")?;
//! assert_eq!(store.read_bytes()?, b"hello");
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod compaction;
pub mod config;
pub mod crash_point;
pub mod directory;
pub mod observability;
pub mod replication;
pub mod store;
pub mod subscription;
mod task;

pub use compaction::{
    CompactionMode, CompactionPolicy, CompactionReport, KeepAll, RetainNewest, RetainWithin,
};
pub use config::StoreConfig;
pub use directory::{Directory, LocalDirectory, MemoryDirectory};
pub use replication::{ReplicationOutcome, Replicator};
pub use store::{
    Clock, ManualClock, Store, StoreError, StoreErrorCode, StoreOption, StoreResult, Version,
    VersionReader, VersionWriter, WeakStore,
};
pub use subscription::Subscription;
pub use task::BackgroundTask;
