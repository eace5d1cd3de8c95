//! Retention and compaction
//!
//! A [`CompactionPolicy`] proposes which versions are superseded; the
//! [`Compactor`] applies it. Before anything is deleted the compactor
//! confirms that at least one version that will remain passes checksum
//! verification:
//!
//! 1. Retained versions are verified newest first until one passes.
//! 2. If none passes, the newest proposed version that passes is spared.
//! 3. If no version in the store passes, nothing is deleted.
//!
//! Compaction therefore never leaves a store without a readable version
//! when it had one before.
//!
//! How often compaction runs is set per store with [`CompactionMode`].

mod compactor;
mod policy;

pub use compactor::{CompactionMode, CompactionReport, Compactor};
pub use policy::{CompactionPolicy, KeepAll, RetainNewest, RetainWithin};
