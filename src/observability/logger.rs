//! Structured JSON logger
//!
//! - One log line = one event
//! - Event first, then severity, then fields in alphabetical order
//! - Synchronous, no buffering
//! - Lines below the configured threshold are discarded

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-candidate detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Parse a threshold name as accepted by `VSTORE_LOG`.
    ///
    /// `off` yields a threshold above every severity.
    fn threshold_from_str(s: &str) -> Option<u8> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Severity::Trace as u8),
            "info" => Some(Severity::Info as u8),
            "warn" => Some(Severity::Warn as u8),
            "error" => Some(Severity::Error as u8),
            "off" => Some(OFF),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const OFF: u8 = u8::MAX;
const UNSET: u8 = u8::MAX - 1;

/// Threshold set through `Logger::set_min_severity`; overrides the env var
static THRESHOLD_OVERRIDE: AtomicU8 = AtomicU8::new(UNSET);

/// Threshold from `VSTORE_LOG` (cached)
static ENV_THRESHOLD: OnceLock<u8> = OnceLock::new();

fn threshold() -> u8 {
    let overridden = THRESHOLD_OVERRIDE.load(Ordering::Relaxed);
    if overridden != UNSET {
        return overridden;
    }
    *ENV_THRESHOLD.get_or_init(|| {
        std::env::var("VSTORE_LOG")
            .ok()
            .and_then(|v| Severity::threshold_from_str(&v))
            .unwrap_or(Severity::Info as u8)
    })
}

/// A structured logger that outputs JSON lines
pub struct Logger;

impl Logger {
    /// Set the minimum severity that gets written, or `None` to silence
    /// the logger entirely.
    pub fn set_min_severity(severity: Option<Severity>) {
        let value = severity.map(|s| s as u8).unwrap_or(OFF);
        THRESHOLD_OVERRIDE.store(value, Ordering::Relaxed);
    }

    /// Whether a line at `severity` would be written
    pub fn enabled(severity: Severity) -> bool {
        (severity as u8) >= threshold()
    }

    /// Log an event with the given severity and fields
    ///
    /// Errors go to stderr, everything else to stdout.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        if severity >= Severity::Error {
            Self::log_to_writer(severity, event, fields, &mut io::stderr());
        } else {
            Self::log_to_writer(severity, event, fields, &mut io::stdout());
        }
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let line = Self::format_line(severity, event, fields);
        // One write per line so concurrent loggers do not interleave
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted_fields: Vec<_> = fields.iter().collect();
        sorted_fields.sort_by_key(|(k, _)| *k);

        let mut line = String::with_capacity(256);
        line.push_str("{\"event\":");
        push_json_str(&mut line, event);
        line.push_str(",\"severity\":");
        push_json_str(&mut line, severity.as_str());
        for (key, value) in sorted_fields {
            line.push(',');
            push_json_str(&mut line, key);
            line.push(':');
            push_json_str(&mut line, value);
        }
        line.push_str("}\n");
        line
    }

    /// Log at TRACE level
    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

/// Append `s` as a quoted, escaped JSON string
fn push_json_str(line: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => line.push_str(&quoted),
        Err(_) => line.push_str("\"\""),
    }
}

/// Render a line without writing it, for tests
#[cfg(test)]
pub fn capture_log(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::log_to_writer(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}
