//! Periodic replication into a destination store

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::copy::copy_newest_after;
use crate::observability::{log_event, Event, Logger, ObservationScope};
use crate::store::{Store, StoreError, StoreResult, Version, WeakStore};
use crate::task::BackgroundTask;

/// Result of one replication pass
#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationOutcome {
    /// A version was copied into the destination
    Copied(Version),
    /// The destination already held a version at least as new as any source
    UpToDate,
}

/// Keeps a destination store current with the newest version across
/// a set of sources.
#[derive(Debug, Clone)]
pub struct Replicator {
    sources: Vec<Store>,
    destination: Store,
    interval: Duration,
}

impl Replicator {
    /// Build a replicator. Needs at least one source and a non-zero interval.
    pub fn new(sources: Vec<Store>, destination: Store, interval: Duration) -> StoreResult<Self> {
        if sources.is_empty() {
            return Err(StoreError::client("replication needs at least one source"));
        }
        if interval.is_zero() {
            return Err(StoreError::client("replication interval must be non-zero"));
        }
        Ok(Self {
            sources,
            destination,
            interval,
        })
    }

    pub fn sources(&self) -> &[Store] {
        &self.sources
    }

    pub fn destination(&self) -> &Store {
        &self.destination
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Copy the newest intact source version if it is newer than anything
    /// the destination holds.
    pub fn run_once(&self) -> StoreResult<ReplicationOutcome> {
        let scope = ObservationScope::with_fields(
            "REPLICATION_PASS",
            &[("to", self.destination.location())],
        );

        let result = self.pass();
        match &result {
            Ok(ReplicationOutcome::Copied(version)) => scope.complete_with_fields(&[
                ("outcome", "copied"),
                ("version", &version.number().to_string()),
            ]),
            Ok(ReplicationOutcome::UpToDate) => {
                scope.complete_with_fields(&[("outcome", "up_to_date")])
            }
            Err(e) => scope.fail(&e.to_string()),
        }
        result
    }

    fn pass(&self) -> StoreResult<ReplicationOutcome> {
        let newest_held = self
            .destination
            .versions()?
            .iter()
            .map(|v| v.created_at())
            .max();

        match copy_newest_after(&self.sources, &self.destination, newest_held)? {
            Some(version) => Ok(ReplicationOutcome::Copied(version)),
            None => {
                log_event(
                    Event::ReplicationUpToDate,
                    &[("to", self.destination.location())],
                );
                Ok(ReplicationOutcome::UpToDate)
            }
        }
    }

    /// Run passes on the current tokio runtime, one per interval tick.
    ///
    /// The loop holds only weak references and exits once any participating
    /// store is closed or dropped, or the task is stopped. Failed passes are
    /// logged and retried on the next tick.
    pub fn spawn(&self) -> StoreResult<BackgroundTask> {
        let sources: Vec<WeakStore> = self.sources.iter().map(Store::downgrade).collect();
        let destination = self.destination.downgrade();
        let interval = self.interval;

        BackgroundTask::spawn("replication", move |mut shutdown_rx| async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {}
                }

                let replicator = match upgrade(&sources, &destination, interval) {
                    Some(replicator) => replicator,
                    None => break,
                };
                let location = replicator.destination.location().to_string();
                let outcome = tokio::task::spawn_blocking(move || replicator.run_once()).await;
                match outcome {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) if e.is_client_error() => break,
                    // The destination gained a version at that time on its own.
                    Ok(Err(e)) if e.is_conflict() => {}
                    Ok(Err(e)) => Logger::warn(
                        "REPLICATION_PASS_RETRY",
                        &[("to", &location), ("error", &e.to_string())],
                    ),
                    Err(e) => Logger::error(
                        "REPLICATION_PASS_PANICKED",
                        &[("to", &location), ("error", &e.to_string())],
                    ),
                }
            }
        })
    }
}

fn upgrade(sources: &[WeakStore], destination: &WeakStore, interval: Duration) -> Option<Replicator> {
    let destination = destination.upgrade().filter(|s| !s.is_closed())?;
    let sources = sources
        .iter()
        .map(|s| s.upgrade().filter(|s| !s.is_closed()))
        .collect::<Option<Vec<Store>>>()?;
    Some(Replicator {
        sources,
        destination,
        interval,
    })
}
