//! Retention policies
//!
//! A policy only proposes deletions. The compactor decides what is actually
//! deleted after checking that a verifiable version survives.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::store::{StoreError, StoreResult, Version};

/// Chooses which versions are superseded
pub trait CompactionPolicy: Send + Sync + fmt::Debug {
    /// Indices into `versions` (ordered newest first) proposed for deletion
    fn select(&self, versions: &[Version], now: DateTime<Utc>) -> Vec<usize>;
}

/// Keep the `count` most recent versions by number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetainNewest {
    count: usize,
}

impl RetainNewest {
    pub const DEFAULT_COUNT: usize = 2;

    pub fn new(count: usize) -> StoreResult<Self> {
        if count == 0 {
            return Err(StoreError::client("retention count must be at least 1"));
        }
        Ok(Self { count })
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl Default for RetainNewest {
    fn default() -> Self {
        Self {
            count: Self::DEFAULT_COUNT,
        }
    }
}

impl CompactionPolicy for RetainNewest {
    fn select(&self, versions: &[Version], _now: DateTime<Utc>) -> Vec<usize> {
        (self.count..versions.len()).collect()
    }
}

/// Keep versions younger than `max_age`, and always the newest one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetainWithin {
    max_age: Duration,
}

impl RetainWithin {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

impl CompactionPolicy for RetainWithin {
    fn select(&self, versions: &[Version], now: DateTime<Utc>) -> Vec<usize> {
        let max_age = match chrono::Duration::from_std(self.max_age) {
            Ok(age) => age,
            Err(_) => return Vec::new(),
        };
        versions
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, v)| now.signed_duration_since(v.created_at()) > max_age)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Never delete anything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeepAll;

impl CompactionPolicy for KeepAll {
    fn select(&self, _versions: &[Version], _now: DateTime<Utc>) -> Vec<usize> {
        Vec::new()
    }
}
