//! Observability subsystem
//!
//! - Structured logging (one JSON object per line)
//! - Typed lifecycle events
//! - Per-store counters
//!
//! Observability never changes store behavior: logging failures are
//! swallowed and counters are write-only from the store's point of view.
//!
//! ```ignore
//! use vstore::observability::{log_event, Event};
//!
//! log_event(Event::VersionCommit, &[("version", "7")]);
//! ```
//!
//! The log threshold defaults to INFO and can be changed with the
//! `VSTORE_LOG` environment variable (`trace|info|warn|error|off`) or
//! [`Logger::set_min_severity`].

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log a lifecycle event at its natural severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::StoreOpen, &[("directory", "/tmp/test")]);
        log_event(Event::ReadFallback, &[("version", "3")]);
    }
}
