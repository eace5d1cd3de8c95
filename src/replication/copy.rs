//! Store-to-store version copy
//!
//! A copy reads a source version pinned by its creation time and writes it
//! to the destination with that same time. The destination writer is
//! aborted on any failure, so a failed copy leaves nothing behind.

use std::io::{Read, Write};

use chrono::{DateTime, Utc};

use crate::crash_point::{maybe_crash, points};
use crate::observability::{log_event, Event};
use crate::store::{Store, StoreError, StoreResult, Version, VersionWriter};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Which side of a copy failed
#[derive(Debug)]
pub(super) enum TransferError {
    /// Reading or verifying the source version
    Source(StoreError),
    /// Creating or writing the destination version
    Destination(StoreError),
}

impl TransferError {
    pub(super) fn into_inner(self) -> StoreError {
        match self {
            TransferError::Source(e) | TransferError::Destination(e) => e,
        }
    }
}

fn abort_with(writer: VersionWriter, err: TransferError) -> TransferError {
    let _ = writer.abort();
    err
}

/// Copy one source version into `to`, keeping its creation time
pub(super) fn transfer(from: &Store, version: &Version, to: &Store) -> Result<Version, TransferError> {
    let mut reader = from
        .reader_at(version.created_at())
        .map_err(TransferError::Source)?;
    let mut writer = to
        .writer_at(version.created_at())
        .map_err(TransferError::Destination)?;

    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(abort_with(writer, TransferError::Source(e.into()))),
        };
        if let Err(e) = writer.write_all(&buf[..n]) {
            return Err(abort_with(writer, TransferError::Destination(e.into())));
        }
    }

    if let Err(e) = reader.close() {
        return Err(abort_with(writer, TransferError::Source(e)));
    }
    maybe_crash(points::REPLICATION_BEFORE_COMMIT);
    writer.close().map_err(TransferError::Destination)
}

fn record_success(to: &Store, from: &Store, copied: &Version) {
    to.metrics().increment_replications();
    log_event(
        Event::ReplicationComplete,
        &[
            ("from", from.location()),
            ("to", to.location()),
            ("created_at", &copied.created_at().to_rfc3339()),
            ("version", &copied.number().to_string()),
        ],
    );
}

fn record_failure(to: &Store, from: &Store, err: &StoreError) {
    to.metrics().increment_replication_failures();
    log_event(
        Event::ReplicationFailed,
        &[
            ("from", from.location()),
            ("to", to.location()),
            ("error", &err.to_string()),
        ],
    );
}

/// Copy the newest listed version of `from` into `to`.
///
/// The version is chosen by listing only; if it fails verification the
/// copy fails. A destination that already holds a version with the same
/// creation time yields a conflict.
pub fn copy(from: &Store, to: &Store) -> StoreResult<Version> {
    let version = from
        .latest_version()?
        .ok_or_else(|| StoreError::data_not_found("source store has no versions"))?;

    log_event(
        Event::ReplicationBegin,
        &[
            ("from", from.location()),
            ("to", to.location()),
            ("version", &version.number().to_string()),
        ],
    );

    match transfer(from, &version, to) {
        Ok(copied) => {
            record_success(to, from, &copied);
            Ok(copied)
        }
        Err(e) => {
            let e = e.into_inner();
            record_failure(to, from, &e);
            Err(e)
        }
    }
}

/// Copy the globally newest intact version across `sources` into `to`.
///
/// Candidates are tried newest first by creation time; on equal times the
/// earlier source wins. Source-side failures move on to the next candidate,
/// destination-side failures are returned.
pub fn copy_newest(sources: &[Store], to: &Store) -> StoreResult<Version> {
    copy_newest_after(sources, to, None)?
        .ok_or_else(|| StoreError::data_not_found("no source store has any versions"))
}

/// Like [`copy_newest`], but only candidates strictly newer than `after`
/// are considered. `Ok(None)` means there was no such candidate.
pub(super) fn copy_newest_after(
    sources: &[Store],
    to: &Store,
    after: Option<DateTime<Utc>>,
) -> StoreResult<Option<Version>> {
    let mut candidates = Vec::new();
    for (index, source) in sources.iter().enumerate() {
        match source.versions() {
            Ok(versions) => candidates.extend(
                versions
                    .into_iter()
                    .filter(|v| after.map_or(true, |t| v.created_at() > t))
                    .map(|v| (index, v)),
            ),
            Err(e) => record_failure(to, source, &e),
        }
    }
    if candidates.is_empty() {
        return Ok(None);
    }

    candidates.sort_by(|(ia, a), (ib, b)| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| ia.cmp(ib))
            .then_with(|| b.number().cmp(&a.number()))
    });

    let attempted = candidates.len();
    for (index, version) in candidates {
        let from = &sources[index];
        log_event(
            Event::ReplicationBegin,
            &[
                ("from", from.location()),
                ("to", to.location()),
                ("version", &version.number().to_string()),
            ],
        );
        match transfer(from, &version, to) {
            Ok(copied) => {
                record_success(to, from, &copied);
                return Ok(Some(copied));
            }
            Err(TransferError::Source(e)) => record_failure(to, from, &e),
            Err(TransferError::Destination(e)) => {
                record_failure(to, from, &e);
                return Err(e);
            }
        }
    }

    Err(StoreError::data_not_found(format!(
        "none of {} candidate versions could be read",
        attempted
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compaction::CompactionMode;
    use crate::directory::{Directory, MemoryDirectory};
    use crate::store::{ManualClock, StoreOption};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn open(clock_start: i64) -> (Store, MemoryDirectory) {
        let dir = MemoryDirectory::new();
        let store = Store::open(
            Arc::new(dir.clone()),
            vec![
                StoreOption::Clock(Arc::new(ManualClock::with_tick(
                    at(clock_start),
                    chrono::Duration::seconds(1),
                ))),
                StoreOption::CompactionMode(CompactionMode::Manual),
            ],
        )
        .unwrap();
        (store, dir)
    }

    #[test]
    fn test_copy_preserves_creation_time() {
        let (src, _) = open(100);
        let (dst, _) = open(9_000);
        src.write_bytes(b"old").unwrap();
        let newest = src.write_bytes(b"new").unwrap();

        let copied = copy(&src, &dst).unwrap();
        assert_eq!(copied.created_at(), newest.created_at());
        assert_eq!(dst.read_bytes().unwrap(), b"new");
        assert_eq!(dst.metrics().snapshot().replications, 1);
    }

    #[test]
    fn test_copy_twice_is_conflict() {
        let (src, _) = open(100);
        let (dst, _) = open(9_000);
        src.write_bytes(b"x").unwrap();
        copy(&src, &dst).unwrap();

        let err = copy(&src, &dst).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(dst.versions().unwrap().len(), 1);
    }

    #[test]
    fn test_copy_from_empty_source() {
        let (src, _) = open(100);
        let (dst, _) = open(9_000);
        assert!(copy(&src, &dst).unwrap_err().is_data_not_found());
    }

    #[test]
    fn test_copy_does_not_fall_back() {
        let (src, src_dir) = open(100);
        let (dst, dst_dir) = open(9_000);
        src.write_bytes(b"good").unwrap();
        let bad = src.write_bytes(b"bad!").unwrap();
        src_dir.corrupt_byte(bad.name(), 0).unwrap();

        let err = copy(&src, &dst).unwrap_err();
        assert!(err.is_checksum_mismatch());
        assert!(dst_dir.list_files().unwrap().is_empty());
        assert_eq!(dst.metrics().snapshot().replication_failures, 1);
    }

    #[test]
    fn test_copy_newest_falls_back_within_and_across_sources() {
        let (a, _) = open(100);
        let (b, b_dir) = open(200);
        let (dst, _) = open(9_000);
        a.write_bytes(b"a1").unwrap();
        b.write_bytes(b"b1").unwrap();
        let b2 = b.write_bytes(b"b2").unwrap();
        b_dir.corrupt_byte(b2.name(), 1).unwrap();

        let copied = copy_newest(&[a.clone(), b.clone()], &dst).unwrap();
        assert_eq!(copied.created_at(), at(200));
        assert_eq!(dst.read_bytes().unwrap(), b"b1");
        assert_eq!(dst.metrics().snapshot().replication_failures, 1);
    }

    #[test]
    fn test_copy_newest_with_no_versions() {
        let (a, _) = open(100);
        let (dst, _) = open(9_000);
        assert!(copy_newest(&[a], &dst).unwrap_err().is_data_not_found());
        assert!(copy_newest(&[], &dst).unwrap_err().is_data_not_found());
    }

    #[test]
    fn test_copy_newest_all_candidates_corrupt() {
        let (a, a_dir) = open(100);
        let (dst, dst_dir) = open(9_000);
        let v = a.write_bytes(b"only").unwrap();
        a_dir.corrupt_byte(v.name(), 2).unwrap();

        assert!(copy_newest(&[a], &dst).unwrap_err().is_data_not_found());
        assert!(dst_dir.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_destination_conflict_is_surfaced() {
        let (a, _) = open(100);
        let (b, _) = open(100);
        let (dst, _) = open(9_000);
        a.write_bytes(b"from a").unwrap();
        b.write_bytes(b"from b").unwrap();
        copy(&a, &dst).unwrap();

        let err = copy_newest(&[b, a], &dst).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_only_newer_candidates_considered() {
        let (a, _) = open(100);
        let (dst, _) = open(9_000);
        a.write_bytes(b"one").unwrap();
        assert_eq!(copy_newest_after(&[a.clone()], &dst, Some(at(100))).unwrap(), None);
        assert!(copy_newest_after(&[a], &dst, Some(at(99))).unwrap().is_some());
    }
}
