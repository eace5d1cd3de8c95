//! Crash point injection for testing durability
//!
//! When `VSTORE_CRASH_POINT` names one of the points below, the process
//! terminates via `std::process::abort()` on reaching it: no cleanup, no
//! unwinding. An external harness can then reopen the store and check that
//! reads still resolve to an intact version.
//!
//! ```bash
//! VSTORE_CRASH_POINT=writer_after_checksum ./my-app
//! ```

use std::sync::OnceLock;

/// Cache the crash point name to avoid repeated env var lookups
static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var("VSTORE_CRASH_POINT").ok())
        .as_deref()
}

/// Check if a specific crash point is enabled
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Abort the process if the named crash point is enabled.
///
/// A no-op when `VSTORE_CRASH_POINT` is unset or names another point.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    /// Data written and flushed, digest not yet persisted
    pub const WRITER_BEFORE_CHECKSUM: &str = "writer_before_checksum";
    /// Sidecar persisted, data not yet synced
    pub const WRITER_AFTER_CHECKSUM: &str = "writer_after_checksum";
    /// Data synced, commit not yet announced
    pub const WRITER_AFTER_SYNC: &str = "writer_after_sync";
    /// Sidecar removed, data file still present
    pub const DELETE_BETWEEN_FILES: &str = "delete_between_files";
    /// Replicated bytes streamed, destination not yet committed
    pub const REPLICATION_BEFORE_COMMIT: &str = "replication_before_commit";

    /// Get all crash point names
    pub fn all() -> &'static [&'static str] {
        &[
            WRITER_BEFORE_CHECKSUM,
            WRITER_AFTER_CHECKSUM,
            WRITER_AFTER_SYNC,
            DELETE_BETWEEN_FILES,
            REPLICATION_BEFORE_COMMIT,
        ]
    }
}
