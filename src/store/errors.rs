//! Store error types
//!
//! Error codes:
//! - VSTORE_CLIENT (ERROR severity): misuse independent of data state
//! - VSTORE_CLOSED (ERROR severity): operation on a closed store
//! - VSTORE_DATA_NOT_FOUND (WARN severity): no version is present and verifiable
//! - VSTORE_VERSION_NOT_FOUND (WARN severity): a specific version is absent
//! - VSTORE_VERSION_CONFLICT (ERROR severity): a version already exists at that time
//! - VSTORE_CHECKSUM_MISMATCH (ERROR severity): stored digest disagrees with the data
//! - VSTORE_IO (ERROR severity): passthrough from the directory

use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::directory::DirectoryError;

/// Severity levels for store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expected outcome the caller can recover from
    Warn,
    /// Operation fails, the store remains usable
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warn => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Store error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Setup or usage problem ("fix your setup")
    ClientError,
    /// The store has been closed
    StoreClosed,
    /// No version exists, or none passed verification ("data unavailable")
    DataNotFound,
    /// The requested version does not exist
    VersionNotFound,
    /// A version already exists at the requested time
    VersionConflict,
    /// Digest comparison failed
    ChecksumMismatch,
    /// Underlying I/O failure
    Io,
}

impl StoreErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::ClientError => "VSTORE_CLIENT",
            StoreErrorCode::StoreClosed => "VSTORE_CLOSED",
            StoreErrorCode::DataNotFound => "VSTORE_DATA_NOT_FOUND",
            StoreErrorCode::VersionNotFound => "VSTORE_VERSION_NOT_FOUND",
            StoreErrorCode::VersionConflict => "VSTORE_VERSION_CONFLICT",
            StoreErrorCode::ChecksumMismatch => "VSTORE_CHECKSUM_MISMATCH",
            StoreErrorCode::Io => "VSTORE_IO",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StoreErrorCode::DataNotFound | StoreErrorCode::VersionNotFound => Severity::Warn,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Store error with code, message and optional cause
#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    details: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl StoreError {
    fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Misuse detectable independent of data state
    pub fn client(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::ClientError, message)
    }

    /// Operation attempted after `close()`
    pub fn closed() -> Self {
        Self::new(StoreErrorCode::StoreClosed, "store is closed")
    }

    /// No version is both present and verifiable
    pub fn data_not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::DataNotFound, message)
    }

    /// A specific version does not exist
    pub fn version_not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::VersionNotFound, message)
    }

    /// A version already exists at the requested time
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::VersionConflict, message)
    }

    /// Digest mismatch for a version
    pub fn checksum_mismatch(version_name: &str, algorithm: &str) -> Self {
        Self::new(
            StoreErrorCode::ChecksumMismatch,
            format!("checksum mismatch for {}", version_name),
        )
        .with_details(format!("algorithm: {}", algorithm))
    }

    /// I/O failure with source
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        let mut err = Self::new(StoreErrorCode::Io, message);
        err.source = Some(Box::new(source));
        err
    }

    /// Add details to an error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach an underlying cause
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Setup/usage errors, including use after close
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.code,
            StoreErrorCode::ClientError | StoreErrorCode::StoreClosed
        )
    }

    pub fn is_data_not_found(&self) -> bool {
        self.code == StoreErrorCode::DataNotFound
    }

    pub fn is_version_not_found(&self) -> bool {
        self.code == StoreErrorCode::VersionNotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.code == StoreErrorCode::VersionConflict
    }

    pub fn is_checksum_mismatch(&self) -> bool {
        self.code == StoreErrorCode::ChecksumMismatch
    }

    pub fn is_io(&self) -> bool {
        self.code == StoreErrorCode::Io
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<DirectoryError> for StoreError {
    fn from(err: DirectoryError) -> Self {
        let code = match err {
            DirectoryError::InvalidName(_) => StoreErrorCode::ClientError,
            _ => StoreErrorCode::Io,
        };
        Self::new(code, err.to_string()).with_source(err)
    }
}

/// Lift an `io::Error` coming back through a stream.
///
/// Directory errors that were tunnelled through `io::Error` keep their
/// classification; store errors tunnelled the same way are unwrapped.
impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        if err
            .get_ref()
            .map(|inner| inner.is::<StoreError>())
            .unwrap_or(false)
        {
            if let Some(inner) = err.into_inner() {
                if let Ok(store_err) = inner.downcast::<StoreError>() {
                    return *store_err;
                }
            }
            return Self::new(StoreErrorCode::Io, "stream failure");
        }
        Self::io(err.to_string(), err)
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StoreErrorCode::ClientError.code(), "VSTORE_CLIENT");
        assert_eq!(StoreErrorCode::DataNotFound.code(), "VSTORE_DATA_NOT_FOUND");
        assert_eq!(StoreErrorCode::ChecksumMismatch.code(), "VSTORE_CHECKSUM_MISMATCH");
    }

    #[test]
    fn test_not_found_errors_are_warnings() {
        assert_eq!(StoreErrorCode::DataNotFound.severity(), Severity::Warn);
        assert_eq!(StoreErrorCode::VersionNotFound.severity(), Severity::Warn);
        assert_eq!(StoreErrorCode::Io.severity(), Severity::Error);
    }

    #[test]
    fn test_client_and_data_errors_are_distinct() {
        let client = StoreError::client("directory does not exist");
        let data = StoreError::data_not_found("no versions");
        assert!(client.is_client_error());
        assert!(!client.is_data_not_found());
        assert!(data.is_data_not_found());
        assert!(!data.is_client_error());
        assert!(StoreError::closed().is_client_error());
    }

    #[test]
    fn test_display_contains_required_fields() {
        let err = StoreError::checksum_mismatch("00000000000000000001_x", "crc32");
        let display = err.to_string();
        assert!(display.contains("VSTORE_CHECKSUM_MISMATCH"));
        assert!(display.contains("ERROR"));
        assert!(display.contains("00000000000000000001_x"));
        assert!(display.contains("crc32"));
    }

    #[test]
    fn test_directory_error_conversion() {
        let err: StoreError = DirectoryError::Io("disk on fire".into()).into();
        assert!(err.is_io());
        assert!(err.source().is_some());

        let err: StoreError = DirectoryError::InvalidName("a/b".into()).into();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_store_error_round_trips_through_io_error() {
        let original = StoreError::checksum_mismatch("v", "crc32");
        let tunnelled = io::Error::new(io::ErrorKind::InvalidData, original);
        let back: StoreError = tunnelled.into();
        assert!(back.is_checksum_mismatch());
    }

    #[test]
    fn test_plain_io_error_conversion() {
        let err: StoreError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(err.is_io());
    }
}
