//! Compaction passes
//!
//! A pass lists versions, asks the policy what is superseded, checks that at
//! least one verifiable version will survive, then deletes oldest first.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::MissedTickBehavior;

use super::policy::CompactionPolicy;
use crate::observability::{log_event, Event, Logger, ObservationScope};
use crate::store::{Store, StoreError, StoreResult, Version};
use crate::task::BackgroundTask;

/// When compaction runs for a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompactionMode {
    /// Only on explicit `Store::compact()`
    Manual,
    /// Once at open and after every committed version
    #[default]
    Inline,
    /// In a tokio task, on every update and at least every `min_interval`
    Background { min_interval: Duration },
}

impl CompactionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompactionMode::Manual => "manual",
            CompactionMode::Inline => "inline",
            CompactionMode::Background { .. } => "background",
        }
    }
}

/// Outcome of one compaction pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    /// Versions listed
    pub examined: usize,
    /// Versions removed
    pub deleted: usize,
    /// Versions the policy proposed but which were kept as the only
    /// verifiable survivor
    pub spared: usize,
    /// Number of the version confirmed intact before deleting anything
    pub verified_survivor: Option<u64>,
}

/// Applies a [`CompactionPolicy`] to a store
#[derive(Debug, Clone)]
pub struct Compactor {
    policy: Arc<dyn CompactionPolicy>,
}

impl Compactor {
    pub fn new(policy: Arc<dyn CompactionPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Arc<dyn CompactionPolicy> {
        &self.policy
    }

    /// Run a single pass against `store`
    pub fn run_once(&self, store: &Store) -> StoreResult<CompactionReport> {
        let scope = ObservationScope::with_fields("COMPACTION_PASS", &[("store", store.location())]);
        match self.pass(store) {
            Ok(report) => {
                let deleted = report.deleted.to_string();
                let spared = report.spared.to_string();
                scope.complete_with_fields(&[("deleted", &deleted), ("spared", &spared)]);
                Ok(report)
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn pass(&self, store: &Store) -> StoreResult<CompactionReport> {
        let versions = store.versions()?;
        let mut report = CompactionReport {
            examined: versions.len(),
            ..Default::default()
        };
        store.metrics().increment_compaction_runs();

        let mut doomed: Vec<usize> = self
            .policy
            .select(&versions, store.now())
            .into_iter()
            .filter(|i| *i < versions.len())
            .collect();
        doomed.sort_unstable();
        doomed.dedup();
        if doomed.is_empty() {
            return Ok(report);
        }

        log_event(
            Event::CompactionBegin,
            &[
                ("store", store.location()),
                ("candidates", &doomed.len().to_string()),
            ],
        );

        let survivor = versions
            .iter()
            .enumerate()
            .filter(|(i, _)| doomed.binary_search(i).is_err())
            .find(|(_, v)| store.verify(v).is_ok())
            .map(|(_, v)| v.number());

        report.verified_survivor = match survivor {
            Some(number) => Some(number),
            None => match spare_newest_verifiable(store, &versions, &mut doomed) {
                Some(number) => {
                    report.spared = 1;
                    Some(number)
                }
                None => {
                    log_event(
                        Event::CompactionSkipped,
                        &[
                            ("store", store.location()),
                            ("reason", "no verifiable version would survive"),
                        ],
                    );
                    return Ok(report);
                }
            },
        };

        for index in doomed.iter().rev() {
            versions[*index].remove()?;
            report.deleted += 1;
        }

        log_event(
            Event::CompactionComplete,
            &[
                ("store", store.location()),
                ("deleted", &report.deleted.to_string()),
            ],
        );
        Ok(report)
    }

    /// Run passes in a tokio task until the store closes or the task is
    /// stopped.
    ///
    /// A pass runs after every update notification and at least once per
    /// `min_interval`.
    pub fn spawn(&self, store: &Store, min_interval: Duration) -> StoreResult<BackgroundTask> {
        if min_interval.is_zero() {
            return Err(StoreError::client("compaction interval must be non-zero"));
        }
        let subscription = store.subscribe()?;
        let weak = store.downgrade();
        let compactor = self.clone();

        BackgroundTask::spawn("compaction", move |mut shutdown_rx| async move {
            let mut subscription = subscription;
            let mut ticker = tokio::time::interval(min_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    changed = subscription.changed() => {
                        if !changed {
                            break;
                        }
                    }
                    _ = ticker.tick() => {}
                }

                let store = match weak.upgrade() {
                    Some(store) if !store.is_closed() => store,
                    _ => break,
                };
                let compactor = compactor.clone();
                let location = store.location().to_string();
                let outcome = tokio::task::spawn_blocking(move || compactor.run_once(&store)).await;
                match outcome {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) if e.is_client_error() => break,
                    Ok(Err(e)) => Logger::warn(
                        "COMPACTION_PASS_FAILED",
                        &[("store", &location), ("error", &e.to_string())],
                    ),
                    Err(e) => Logger::error(
                        "COMPACTION_PASS_PANICKED",
                        &[("store", &location), ("error", &e.to_string())],
                    ),
                }
            }
        })
    }
}

/// Find the newest proposed version that verifies, drop it from `doomed`
/// and return its number.
fn spare_newest_verifiable(
    store: &Store,
    versions: &[Version],
    doomed: &mut Vec<usize>,
) -> Option<u64> {
    let position = doomed.iter().position(|i| store.verify(&versions[*i]).is_ok())?;
    let index = doomed.remove(position);
    Some(versions[index].number())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compaction::{KeepAll, RetainNewest};
    use crate::directory::{Directory, MemoryDirectory};
    use crate::store::StoreOption;

    fn manual_store(dir: &MemoryDirectory, retain: usize) -> Store {
        Store::open(
            Arc::new(dir.clone()),
            vec![
                StoreOption::Compaction(Arc::new(RetainNewest::new(retain).unwrap())),
                StoreOption::CompactionMode(CompactionMode::Manual),
            ],
        )
        .unwrap()
    }

    fn write(store: &Store, data: &[u8]) -> Version {
        store.write_bytes(data).unwrap()
    }

    #[test]
    fn test_retain_two_after_three_writes() {
        let dir = MemoryDirectory::new();
        let store = manual_store(&dir, 2);
        write(&store, b"one");
        write(&store, b"two");
        write(&store, b"three");

        let report = store.compact().unwrap();
        assert_eq!(report.examined, 3);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.verified_survivor, Some(3));

        let numbers: Vec<u64> = store.versions().unwrap().iter().map(|v| v.number()).collect();
        assert_eq!(numbers, vec![3, 2]);
        assert_eq!(dir.list_files().unwrap().len(), 4);
    }

    #[test]
    fn test_nothing_to_do() {
        let dir = MemoryDirectory::new();
        let store = manual_store(&dir, 2);
        write(&store, b"one");
        let report = store.compact().unwrap();
        assert_eq!(report, CompactionReport { examined: 1, ..Default::default() });
    }

    #[test]
    fn test_falls_through_to_older_retained_survivor() {
        let dir = MemoryDirectory::new();
        let store = manual_store(&dir, 2);
        write(&store, b"one");
        write(&store, b"two");
        let newest = write(&store, b"three");
        dir.corrupt_byte(newest.name(), 0).unwrap();

        let report = store.compact().unwrap();
        assert_eq!(report.verified_survivor, Some(2));
        assert_eq!(report.deleted, 1);
        assert_eq!(report.spared, 0);
    }

    #[test]
    fn test_spares_verifiable_version_when_retained_set_is_corrupt() {
        let dir = MemoryDirectory::new();
        let store = manual_store(&dir, 1);
        write(&store, b"one");
        write(&store, b"two");
        let newest = write(&store, b"three");
        dir.corrupt_byte(newest.name(), 0).unwrap();

        let report = store.compact().unwrap();
        assert_eq!(report.spared, 1);
        assert_eq!(report.verified_survivor, Some(2));
        assert_eq!(report.deleted, 1);

        let numbers: Vec<u64> = store.versions().unwrap().iter().map(|v| v.number()).collect();
        assert_eq!(numbers, vec![3, 2]);
        assert_eq!(store.read_bytes().unwrap(), b"two");
    }

    #[test]
    fn test_deletes_nothing_when_nothing_verifies() {
        let dir = MemoryDirectory::new();
        let store = manual_store(&dir, 1);
        let a = write(&store, b"one");
        let b = write(&store, b"two");
        dir.corrupt_byte(a.name(), 0).unwrap();
        dir.corrupt_byte(b.name(), 0).unwrap();

        let report = store.compact().unwrap();
        assert_eq!(report.deleted, 0);
        assert_eq!(report.verified_survivor, None);
        assert_eq!(store.versions().unwrap().len(), 2);
    }

    #[test]
    fn test_keep_all_policy() {
        let dir = MemoryDirectory::new();
        let store = Store::open(
            Arc::new(dir.clone()),
            vec![StoreOption::Compaction(Arc::new(KeepAll))],
        )
        .unwrap();
        for i in 0..5u8 {
            write(&store, &[i]);
        }
        assert_eq!(store.versions().unwrap().len(), 5);
    }

    #[test]
    fn test_metrics_recorded() {
        let dir = MemoryDirectory::new();
        let store = manual_store(&dir, 1);
        write(&store, b"one");
        write(&store, b"two");
        store.compact().unwrap();
        let snapshot = store.metrics().snapshot();
        assert_eq!(snapshot.compaction_runs, 1);
        assert_eq!(snapshot.versions_deleted, 1);
    }

    #[test]
    fn test_background_requires_runtime() {
        let dir = MemoryDirectory::new();
        let store = manual_store(&dir, 2);
        let compactor = Compactor::new(Arc::new(RetainNewest::default()));
        let err = compactor.spawn(&store, Duration::from_secs(1)).unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let dir = MemoryDirectory::new();
        let store = manual_store(&dir, 2);
        let compactor = Compactor::new(Arc::new(RetainNewest::default()));
        assert!(compactor.spawn(&store, Duration::ZERO).unwrap_err().is_client_error());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_background_compaction_follows_writes() {
        let dir = MemoryDirectory::new();
        let store = manual_store(&dir, 1);
        let task = Compactor::new(Arc::new(RetainNewest::new(1).unwrap()))
            .spawn(&store, Duration::from_millis(20))
            .unwrap();

        write(&store, b"one");
        write(&store, b"two");
        write(&store, b"three");

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if store.versions().unwrap().len() == 1 {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "compaction did not run");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.read_bytes().unwrap(), b"three");
        task.shutdown().await;
    }

    #[tokio::test]
    async fn test_background_task_exits_on_store_close() {
        let dir = MemoryDirectory::new();
        let store = manual_store(&dir, 2);
        let task = Compactor::new(Arc::new(RetainNewest::default()))
            .spawn(&store, Duration::from_secs(60))
            .unwrap();
        store.close();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !task.is_finished() {
            assert!(tokio::time::Instant::now() < deadline, "task did not exit");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
