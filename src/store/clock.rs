//! Time source for version timestamps

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Supplies creation times for new versions
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic timestamps.
///
/// With a non-zero tick, every `now()` call returns the current time and then
/// advances by the tick.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(DateTime<Utc>, Duration)>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_tick(start, Duration::zero())
    }

    pub fn with_tick(start: DateTime<Utc>, tick: Duration) -> Self {
        Self {
            state: Mutex::new((start, tick)),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).0 = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.0 += by;
    }

    /// Current time without ticking
    pub fn peek(&self) -> DateTime<Utc> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).0
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let now = state.0;
        state.0 = now + state.1;
        now
    }
}
